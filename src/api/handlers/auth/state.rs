//! Auth configuration and shared handler state.

use secrecy::SecretString;
use std::sync::Arc;

use super::rate_limit::RateLimiter;
use super::session::SessionSigner;
use crate::api::email::EmailSender;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 30 * 60;
const DEFAULT_VERIFY_TOKEN_TTL_SECONDS: i64 = 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_secret: SecretString,
    public_base_url: String,
    session_ttl_seconds: i64,
    reset_token_ttl_seconds: i64,
    verify_token_ttl_seconds: i64,
    dev_links: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(session_secret: SecretString, public_base_url: String) -> Self {
        Self {
            session_secret,
            public_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            verify_token_ttl_seconds: DEFAULT_VERIFY_TOKEN_TTL_SECONDS,
            dev_links: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_verify_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.verify_token_ttl_seconds = seconds;
        self
    }

    /// Include raw token links in responses when no email provider is wired.
    #[must_use]
    pub fn with_dev_links(mut self, dev_links: bool) -> Self {
        self.dev_links = dev_links;
        self
    }

    pub(crate) fn session_secret(&self) -> &SecretString {
        &self.session_secret
    }

    pub(crate) fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    pub(crate) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(crate) fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }

    pub(crate) fn verify_token_ttl_seconds(&self) -> i64 {
        self.verify_token_ttl_seconds
    }

    pub(crate) fn dev_links(&self) -> bool {
        self.dev_links
    }

    pub(crate) fn session_cookie_secure(&self) -> bool {
        self.public_base_url.starts_with("https://")
    }

    /// Verification link included in outbound emails and dev responses.
    pub(crate) fn verify_link(&self, token: &str) -> String {
        let base = self.public_base_url.trim_end_matches('/');
        format!("{base}/verify-email?token={token}")
    }

    /// Password reset link included in outbound emails and dev responses.
    pub(crate) fn reset_link(&self, token: &str) -> String {
        let base = self.public_base_url.trim_end_matches('/');
        format!("{base}/reset-password?token={token}")
    }
}

pub struct AuthState {
    config: AuthConfig,
    signer: SessionSigner,
    rate_limiter: Arc<dyn RateLimiter>,
    email: Arc<dyn EmailSender>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        rate_limiter: Arc<dyn RateLimiter>,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        let signer = SessionSigner::new(config.session_secret(), config.session_ttl_seconds());
        Self {
            config,
            signer,
            rate_limiter,
            email,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn signer(&self) -> &SessionSigner {
        &self.signer
    }

    pub(crate) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }

    pub(crate) fn email(&self) -> &Arc<dyn EmailSender> {
        &self.email
    }
}
