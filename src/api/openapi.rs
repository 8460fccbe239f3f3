//! `OpenAPI` document and Swagger UI wiring.

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{auth, health, me, root, users};

/// The generated document; `Info` fields come from Cargo metadata.
///
/// Add new endpoints to `paths(...)` so they are documented alongside the
/// route registration in `api::new`. `OPTIONS /health` is intentionally not
/// documented.
#[derive(OpenApi)]
#[openapi(
    paths(
        root::root,
        health::health,
        auth::register::register,
        auth::login::login,
        auth::login::logout,
        auth::password::change_password,
        auth::password::forgot_password,
        auth::password::reset_password,
        auth::password::validate_reset_token,
        auth::verification::request_verify,
        auth::verification::verify_email,
        auth::verification::validate_verify_token,
        me::read_me,
        me::update_me,
        users::list_users,
        users::update_user,
        users::delete_user,
    ),
    components(schemas(
        auth::types::RegisterRequest,
        auth::types::LoginRequest,
        auth::types::TokenResponse,
        auth::types::ChangePasswordRequest,
        auth::types::ForgotPasswordRequest,
        auth::types::ForgotPasswordResponse,
        auth::types::ResetPasswordRequest,
        auth::types::RequestVerifyRequest,
        auth::types::RequestVerifyResponse,
        auth::types::VerifyEmailRequest,
        auth::types::TokenProbeResponse,
        auth::types::UserResponse,
        health::Health,
        root::ServiceInfo,
        me::UserUpdateRequest,
        users::UserListResponse,
        users::AdminUserUpdateRequest,
    )),
    tags(
        (name = "health", description = "Service status"),
        (name = "auth", description = "Registration, login, and credential tokens"),
        (name = "users", description = "Profile of the authenticated user"),
        (name = "admin", description = "User management for superusers")
    )
)]
pub struct ApiDoc;

/// Serve the interactive docs at `/docs` and the raw document next to it.
pub(crate) fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn openapi_covers_the_auth_surface() {
        let spec = ApiDoc::openapi();
        for path in [
            "/",
            "/health",
            "/auth/register",
            "/auth/login",
            "/auth/logout",
            "/auth/change-password",
            "/auth/forgot-password",
            "/auth/reset-password",
            "/auth/reset-password/validate",
            "/auth/request-verify",
            "/auth/verify-email",
            "/auth/verify-email/validate",
            "/users/me",
            "/admin/users",
            "/admin/users/{user_id}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing path {path}");
        }
    }

    #[test]
    fn openapi_tags_are_declared() {
        let spec = ApiDoc::openapi();
        let tags = spec.tags.unwrap_or_default();
        for name in ["health", "auth", "users", "admin"] {
            assert!(tags.iter().any(|tag| tag.name == name), "missing tag {name}");
        }
    }
}
