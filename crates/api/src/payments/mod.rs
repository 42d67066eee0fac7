//! Payment processor integration.

pub mod gateway;

pub use gateway::{ChargeOutcome, HttpPaymentGateway, PaymentGateway};
