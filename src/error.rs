use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

pub const VALIDATION_ERROR: &str = "Validation error";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const EMAIL_EXISTS: &str = "Email already in use";
pub const BLOG_NOT_FOUND: &str = "Blog not found";
pub const COMMENT_NOT_FOUND: &str = "Comment not found";
pub const NOT_AUTHORIZED: &str = "You are not authorized to perform this action";
pub const ALREADY_LIKED: &str = "Already liked";
pub const NOT_LIKED: &str = "Not liked yet";
pub const TOKEN_MISSING: &str = "Authorization token is missing";
pub const TOKEN_INVALID: &str = "Invalid or expired token";
pub const SERVER_ERROR: &str = "Something went wrong. Please try again later.";

/// Field name → message, in a stable order for responses and tests.
pub type FieldErrors = BTreeMap<String, String>;

/// Every failure a handler can surface. Only `Internal` carries detail that
/// must not reach the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, errors: FieldErrors },
    #[error("{0}")]
    Authentication(&'static str),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("not authorized")]
    Authorization,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Duplicate(&'static str),
    #[error("already liked")]
    AlreadyLiked,
    #[error("not liked")]
    NotLiked,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Validation failure for a single input without a field map.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors: FieldErrors::new(),
        }
    }

    /// Validation failure collected per field. `None` when nothing failed.
    pub fn from_fields(errors: FieldErrors) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self::Validation {
                message: VALIDATION_ERROR.into(),
                errors,
            })
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::AlreadyLiked | Self::NotLiked => StatusCode::BAD_REQUEST,
            Self::Authentication(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Duplicate(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::Authentication(msg) | Self::NotFound(msg) | Self::Duplicate(msg) => {
                (*msg).to_string()
            }
            Self::InvalidCredentials => INVALID_CREDENTIALS.into(),
            Self::Authorization => NOT_AUTHORIZED.into(),
            Self::AlreadyLiked => ALREADY_LIKED.into(),
            Self::NotLiked => NOT_LIKED.into(),
            Self::Internal(_) => SERVER_ERROR.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            error!(error = ?e, "internal error");
        }
        let status = self.status();
        let message = self.client_message();
        let errors = match self {
            Self::Validation { errors, .. } if !errors.is_empty() => Some(errors),
            _ => None,
        };
        (status, Json(ErrorBody { message, errors })).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn internal_errors_are_redacted() {
        let (status, body) =
            body_json(AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.7"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], SERVER_ERROR);
        assert!(!body.to_string().contains("10.0.0.7"));
    }

    #[tokio::test]
    async fn validation_errors_carry_field_map() {
        let mut fields = FieldErrors::new();
        fields.insert("title".into(), "Blog title is required".into());
        let err = AppError::from_fields(fields).expect("non-empty");
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], VALIDATION_ERROR);
        assert_eq!(body["errors"]["title"], "Blog title is required");
    }

    #[tokio::test]
    async fn plain_errors_have_message_only() {
        let (status, body) = body_json(AppError::NotFound(BLOG_NOT_FOUND)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({ "message": BLOG_NOT_FOUND }));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::AlreadyLiked.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotLiked.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Authorization.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Duplicate(EMAIL_EXISTS).status(), StatusCode::CONFLICT);
        assert!(AppError::from_fields(FieldErrors::new()).is_none());
    }
}
