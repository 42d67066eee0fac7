//! Credential resolution: one extractor turning the `Authorization` header
//! into a typed [`Principal`].
//!
//! Callers are either the trusted service identity (presenting the shared
//! service key) or a token bound to exactly one user. All authorization
//! decisions downstream work on the resolved principal; no handler parses
//! credentials itself.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use medialoom_core::error::CoreError;
use medialoom_core::types::DbId;
use medialoom_db::repositories::UserRepo;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// The resolved caller identity.
///
/// Use this as an extractor parameter in any handler that requires
/// authentication:
///
/// ```ignore
/// async fn my_handler(principal: Principal) -> AppResult<Json<()>> {
///     tracing::info!(scope = ?principal.scope_user(), "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    /// The trusted service identity: unrestricted visibility.
    Service,
    /// A token bound to exactly one active user: visibility restricted to
    /// that user's projects.
    User(DbId),
}

impl Principal {
    /// The user scope this principal is confined to (`None` for service).
    pub fn scope_user(&self) -> Option<DbId> {
        match self {
            Self::Service => None,
            Self::User(id) => Some(*id),
        }
    }

    pub fn is_service(&self) -> bool {
        matches!(self, Self::Service)
    }

    /// Reject unless this principal may act on `user_id`'s resources.
    pub fn authorize_user(&self, user_id: DbId) -> Result<(), AppError> {
        match self {
            Self::Service => Ok(()),
            Self::User(own) if *own == user_id => Ok(()),
            Self::User(_) => Err(AppError::Core(CoreError::Forbidden(
                "Credential is not scoped to this user".into(),
            ))),
        }
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        if token == state.config.service_key {
            return Ok(Principal::Service);
        }

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        // A valid signature is not enough: the token must map to an active
        // principal.
        let user = UserRepo::find_by_id(&state.pool, claims.sub)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| {
                AppError::Core(CoreError::Forbidden(
                    "Token does not map to an active user".into(),
                ))
            })?;

        Ok(Principal::User(user.id))
    }
}

/// Requires the service identity. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn service_only(RequireService(principal): RequireService) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireService(pub Principal);

impl FromRequestParts<AppState> for RequireService {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        if !principal.is_service() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Service identity required".into(),
            )));
        }
        Ok(RequireService(principal))
    }
}
