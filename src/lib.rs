//! # IdeaHub credential service
//!
//! `ideahub` owns the credential and token lifecycle for the IdeaHub API:
//! password accounts, stateless signed sessions, and the single-use email
//! tokens behind address verification and password recovery.
//!
//! ## Sessions
//!
//! Sessions are stateless HS256 JWTs carrying only `sub` (user id), `iat`
//! and `exp`. They ride either an `Authorization: Bearer` header or the
//! `ideahub_session` cookie, so browser and API clients share one
//! verification path. There is no server-side session table; logout simply
//! clears the cookie.
//!
//! ## Single-use tokens
//!
//! Verification and password reset links carry random 32-byte tokens. Only
//! the SHA-256 hex digest of a token is stored, and consumption is a single
//! conditional `UPDATE` gated on `consumed_at IS NULL AND expires_at >
//! NOW()`, so a token can be spent exactly once no matter how many requests
//! race for it. Issuing a fresh token invalidates the older unconsumed
//! tokens of the same kind within the same transaction.
//!
//! ## Enumeration resistance
//!
//! Login failures collapse to one message whatever the cause, and the
//! forgot-password / resend-verification endpoints return the same `202`
//! whether or not the address exists.
//!
//! See `db/sql/schema.sql` for the backing tables.

pub mod api;
pub mod cli;
