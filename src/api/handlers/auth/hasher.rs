//! Password hashing built on Argon2id with per-hash salts.
//!
//! Hashing and verification run on the blocking pool so the deliberate CPU
//! cost never stalls the async executor.

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::error;

/// Hash a plaintext password into a PHC-format digest.
pub(crate) async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| anyhow!("failed to hash password: {err}"))
    })
    .await
    .context("password hashing task failed")?
}

/// Verify a plaintext password against a stored digest.
///
/// Any failure, including a malformed stored digest, is a `false` verdict;
/// callers never learn why verification failed.
pub(crate) async fn verify_password(password: String, stored_digest: String) -> bool {
    let outcome = tokio::task::spawn_blocking(move || {
        let Ok(parsed) = PasswordHash::new(&stored_digest) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await;

    match outcome {
        Ok(verdict) => verdict,
        Err(err) => {
            error!("password verification task failed: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify_round_trip() {
        let digest = hash_password("Passw0rd!".to_string())
            .await
            .expect("hashing should succeed");
        assert!(digest.starts_with("$argon2"));
        assert!(verify_password("Passw0rd!".to_string(), digest.clone()).await);
        assert!(!verify_password("wrong-password".to_string(), digest).await);
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let first = hash_password("Passw0rd!".to_string())
            .await
            .expect("hashing should succeed");
        let second = hash_password("Passw0rd!".to_string())
            .await
            .expect("hashing should succeed");
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn malformed_digest_fails_closed() {
        assert!(!verify_password("Passw0rd!".to_string(), "not-a-phc-digest".to_string()).await);
        assert!(!verify_password("Passw0rd!".to_string(), String::new()).await);
    }
}
