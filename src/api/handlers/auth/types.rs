//! Request/response types for the auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Public representation of a user; password digests never leave the store.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordResponse {
    pub detail: String,
    /// Only present when no email provider is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_reset_link: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RequestVerifyRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RequestVerifyResponse {
    pub detail: String,
    /// Only present when no email provider is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_verify_link: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(ToSchema, Deserialize, IntoParams, Debug)]
pub struct TokenProbeQuery {
    /// Raw token from the emailed link.
    pub token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenProbeResponse {
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn register_request_defaults_full_name() -> Result<()> {
        let decoded: RegisterRequest =
            serde_json::from_str(r#"{"email":"alice@example.com","password":"Passw0rd!"}"#)?;
        assert_eq!(decoded.email, "alice@example.com");
        assert_eq!(decoded.full_name, None);
        Ok(())
    }

    #[test]
    fn user_response_round_trips() -> Result<()> {
        let user = UserResponse {
            id: "3e9d2c7a-4b2f-4a5e-9a64-0a4df7d9a911".to_string(),
            email: "alice@example.com".to_string(),
            full_name: Some("Alice".to_string()),
            is_active: true,
            is_superuser: false,
            is_verified: true,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-02T00:00:00Z".to_string(),
        };
        let value = serde_json::to_value(&user)?;
        let decoded: UserResponse = serde_json::from_value(value)?;
        assert_eq!(decoded.email, "alice@example.com");
        assert!(decoded.is_verified);
        Ok(())
    }

    #[test]
    fn dev_links_are_omitted_when_absent() -> Result<()> {
        let response = ForgotPasswordResponse {
            detail: "If the account exists, a password reset link has been sent".to_string(),
            dev_reset_link: None,
        };
        let value = serde_json::to_value(&response)?;
        assert!(value.get("dev_reset_link").is_none());

        let response = RequestVerifyResponse {
            detail: "sent".to_string(),
            dev_verify_link: Some("https://ideahub.dev/verify-email?token=abc".to_string()),
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(
            value
                .get("dev_verify_link")
                .and_then(serde_json::Value::as_str),
            Some("https://ideahub.dev/verify-email?token=abc")
        );
        Ok(())
    }
}
