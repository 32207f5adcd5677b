use axum::extract::FromRequest;
use uuid::Uuid;

use crate::error::AppError;

/// `axum::Json` whose rejection is reported through `AppError`, so malformed
/// bodies get the same `{message}` shape as every other 400.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path ids that are not UUIDs cannot name an existing resource.
pub fn parse_id(raw: &str, not_found: &'static str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(not_found))
}
