use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{jwt::JwtKeys, repo_types::Role, services::UserDirectory},
    error::{AppError, TOKEN_INVALID, TOKEN_MISSING},
    state::AppState,
};

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

/// Extracts and validates the bearer token, then loads the user it names.
#[derive(Debug)]
pub struct AuthUser(pub Actor);

pub(crate) fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Authentication(TOKEN_MISSING))?;

    auth.strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Authentication(TOKEN_MISSING))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            warn!(error = %e, "rejected bearer token");
            AppError::Authentication(TOKEN_INVALID)
        })?;

        // A token can outlive its user row; treat that as an invalid token.
        let user = UserDirectory::from_ref(state)
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token for unknown user");
                AppError::Authentication(TOKEN_INVALID)
            })?;

        Ok(AuthUser(Actor {
            id: user.id,
            role: user.role,
        }))
    }
}
