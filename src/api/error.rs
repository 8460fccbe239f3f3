//! Service error taxonomy and its HTTP mapping.
//!
//! Authentication failures are deliberately generic so callers cannot probe
//! which sub-check failed. Authorization failures carry a specific reason
//! since identity is already established. Store and unexpected failures are
//! logged and collapse to an opaque 500; the request id on the surrounding
//! span is the correlation handle.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub(crate) const GENERIC_CREDENTIALS_DETAIL: &str = "Could not validate credentials";
pub(crate) const GENERIC_LOGIN_DETAIL: &str = "Incorrect email or password";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests, retry later")]
    RateLimited,

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Generic 401 used by the access guard and session validation.
    pub fn invalid_credentials() -> Self {
        Self::Authentication(GENERIC_CREDENTIALS_DETAIL.to_string())
    }

    /// Generic 401 used by login so unknown email and wrong password are
    /// indistinguishable.
    pub fn invalid_login() -> Self {
        Self::Authentication(GENERIC_LOGIN_DETAIL.to_string())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::Authentication(message) => (StatusCode::UNAUTHORIZED, message.clone()),
            Self::Authorization(message) => (StatusCode::FORBIDDEN, message.clone()),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            Self::Store(err) => {
                error!("store error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Self::Internal(err) => {
                error!("internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let mut response = (status, Json(json!({ "detail": detail }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
