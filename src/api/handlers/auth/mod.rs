//! Auth handlers and supporting modules.
//!
//! Flow overview: passwords are verified against slow salted digests and
//! exchanged for signed stateless session tokens, delivered both as a bearer
//! token and as an `HttpOnly` cookie. Email verification and password reset
//! ride on single-use random tokens whose digests live in the database; a
//! conditional UPDATE consumes them so each link works at most once, even
//! under concurrent submissions.
//!
//! ## Enumeration resistance
//!
//! Login, forgot-password, and request-verify never reveal whether an email
//! is registered. Those three endpoints also sit behind a per-IP fixed-window
//! rate limit.

mod hasher;
pub(crate) mod login;
pub(crate) mod password;
pub(crate) mod principal;
mod rate_limit;
pub(crate) mod register;
mod session;
mod state;
pub(crate) mod storage;
pub(crate) mod types;
pub(crate) mod utils;
pub(crate) mod verification;

pub use rate_limit::{FixedWindowLimiter, NoopRateLimiter, RateLimiter};
pub use state::{AuthConfig, AuthState};
