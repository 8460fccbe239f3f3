//! Account registration endpoint.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::api::email;
use crate::api::error::ServiceError;

use super::hasher::hash_password;
use super::state::AuthState;
use super::storage::{register_user, RegisterOutcome};
use super::types::{RegisterRequest, UserResponse};
use super::utils::{normalize_email, valid_email, validate_password};

/// Create a new unverified account and queue the verification email.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input or email already registered")
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<Response, ServiceError> {
    let Some(Json(request)) = payload else {
        return Err(ServiceError::validation("Missing payload"));
    };
    let RegisterRequest {
        email,
        password,
        full_name,
    } = request;

    let email = normalize_email(&email);
    if !valid_email(&email) {
        return Err(ServiceError::validation("Invalid email address"));
    }
    if let Err(message) = validate_password(&password) {
        return Err(ServiceError::validation(message));
    }
    let full_name = full_name.as_deref().map(str::trim).filter(|name| !name.is_empty());

    let hashed_password = hash_password(password).await?;

    let config = auth_state.config();
    let outcome = register_user(
        &pool,
        &email,
        &hashed_password,
        full_name,
        config.verify_token_ttl_seconds(),
    )
    .await?;

    match outcome {
        RegisterOutcome::Created {
            profile,
            verify_token,
        } => {
            let link = config.verify_link(&verify_token);
            let message = email::verification_email(&profile.email, &link);
            if let Err(err) = auth_state.email().send(&message) {
                error!("failed to queue verification email: {err}");
            }
            Ok((StatusCode::CREATED, Json(profile.into_response())).into_response())
        }
        RegisterOutcome::Conflict => Err(ServiceError::validation("Email already registered")),
    }
}

#[cfg(test)]
mod tests {
    use super::super::rate_limit::NoopRateLimiter;
    use super::super::state::{AuthConfig, AuthState};
    use super::{register, RegisterRequest};
    use crate::api::email::LogEmailSender;
    use anyhow::Result;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::Json;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn auth_state() -> Arc<AuthState> {
        let config = AuthConfig::new(
            SecretString::from("register-test-secret"),
            "http://localhost:5173".to_string(),
        );
        Arc::new(AuthState::new(
            config,
            Arc::new(NoopRateLimiter),
            Arc::new(LogEmailSender),
        ))
    }

    #[tokio::test]
    async fn register_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = register(Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_invalid_email() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = register(
            Extension(pool),
            Extension(auth_state()),
            Some(Json(RegisterRequest {
                email: "not-an-email".to_string(),
                password: "Passw0rd!".to_string(),
                full_name: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_short_password() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = register(
            Extension(pool),
            Extension(auth_state()),
            Some(Json(RegisterRequest {
                email: "alice@example.com".to_string(),
                password: "short".to_string(),
                full_name: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
