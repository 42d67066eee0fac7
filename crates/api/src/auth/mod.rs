//! Authentication primitives: JWT access tokens for user-bound credentials.

pub mod jwt;
