//! Database helpers for users and single-use credential tokens.

use anyhow::{Context, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::UserResponse;
use super::utils::{generate_token, hash_token, is_unique_violation};

/// Outcome when attempting to create a new user + verification token.
#[derive(Debug)]
pub(super) enum RegisterOutcome {
    Created {
        profile: UserProfile,
        verify_token: String,
    },
    Conflict,
}

/// Outcome of a profile update through `/users/me`.
#[derive(Debug)]
pub(crate) enum ProfileUpdateOutcome {
    Updated {
        profile: UserProfile,
        verify_token: Option<String>,
    },
    EmailTaken,
    NotFound,
}

/// Fields needed for authentication and authorization decisions.
pub(super) struct UserRecord {
    pub(super) id: Uuid,
    pub(super) email: String,
    pub(super) hashed_password: String,
    pub(super) is_active: bool,
    pub(super) is_superuser: bool,
    pub(super) is_verified: bool,
}

/// Public view of a user row, timestamps rendered as UTC strings.
#[derive(Debug, Clone)]
pub(crate) struct UserProfile {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) full_name: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) is_superuser: bool,
    pub(crate) is_verified: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl UserProfile {
    pub(crate) fn into_response(self) -> UserResponse {
        UserResponse {
            id: self.id.to_string(),
            email: self.email,
            full_name: self.full_name,
            is_active: self.is_active,
            is_superuser: self.is_superuser,
            is_verified: self.is_verified,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Which single-use token table a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Reset,
    Verification,
}

const INVALIDATE_RESET_SQL: &str = r"
        UPDATE password_reset_tokens
        SET consumed_at = NOW()
        WHERE user_id = $1
          AND consumed_at IS NULL
    ";

const INVALIDATE_VERIFICATION_SQL: &str = r"
        UPDATE email_verification_tokens
        SET consumed_at = NOW()
        WHERE user_id = $1
          AND consumed_at IS NULL
    ";

const INSERT_RESET_SQL: &str = r"
        INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";

const INSERT_VERIFICATION_SQL: &str = r"
        INSERT INTO email_verification_tokens (user_id, token_hash, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";

// Reset tokens join on the owner so a deactivated account cannot redeem one.
const CONSUME_RESET_SQL: &str = r"
        UPDATE password_reset_tokens t
        SET consumed_at = NOW()
        FROM users u
        WHERE t.user_id = u.id
          AND u.is_active
          AND t.token_hash = $1
          AND t.consumed_at IS NULL
          AND t.expires_at > NOW()
        RETURNING t.user_id
    ";

const CONSUME_VERIFICATION_SQL: &str = r"
        UPDATE email_verification_tokens
        SET consumed_at = NOW()
        WHERE token_hash = $1
          AND consumed_at IS NULL
          AND expires_at > NOW()
        RETURNING user_id
    ";

const PROBE_RESET_SQL: &str = r"
        SELECT 1
        FROM password_reset_tokens t
        JOIN users u ON u.id = t.user_id
        WHERE u.is_active
          AND t.token_hash = $1
          AND t.consumed_at IS NULL
          AND t.expires_at > NOW()
        LIMIT 1
    ";

const PROBE_VERIFICATION_SQL: &str = r"
        SELECT 1
        FROM email_verification_tokens
        WHERE token_hash = $1
          AND consumed_at IS NULL
          AND expires_at > NOW()
        LIMIT 1
    ";

impl TokenKind {
    const fn invalidate_sql(self) -> &'static str {
        match self {
            Self::Reset => INVALIDATE_RESET_SQL,
            Self::Verification => INVALIDATE_VERIFICATION_SQL,
        }
    }

    const fn insert_sql(self) -> &'static str {
        match self {
            Self::Reset => INSERT_RESET_SQL,
            Self::Verification => INSERT_VERIFICATION_SQL,
        }
    }

    const fn consume_sql(self) -> &'static str {
        match self {
            Self::Reset => CONSUME_RESET_SQL,
            Self::Verification => CONSUME_VERIFICATION_SQL,
        }
    }

    const fn probe_sql(self) -> &'static str {
        match self {
            Self::Reset => PROBE_RESET_SQL,
            Self::Verification => PROBE_VERIFICATION_SQL,
        }
    }
}

fn read_profile(row: &PgRow) -> UserProfile {
    UserProfile {
        id: row.get("id"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        is_active: row.get("is_active"),
        is_superuser: row.get("is_superuser"),
        is_verified: row.get("is_verified"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn read_user_record(row: &PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        hashed_password: row.get("hashed_password"),
        is_active: row.get("is_active"),
        is_superuser: row.get("is_superuser"),
        is_verified: row.get("is_verified"),
    }
}

pub(super) async fn lookup_user_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserRecord>> {
    let query = r"
        SELECT id, email, hashed_password, is_active, is_superuser, is_verified
        FROM users
        WHERE email = $1
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.map(|row| read_user_record(&row)))
}

pub(super) async fn lookup_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRecord>> {
    let query = r"
        SELECT id, email, hashed_password, is_active, is_superuser, is_verified
        FROM users
        WHERE id = $1
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.map(|row| read_user_record(&row)))
}

pub(crate) async fn lookup_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<UserProfile>> {
    let query = r#"
        SELECT id, email, full_name, is_active, is_superuser, is_verified,
               to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
               to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
        FROM users
        WHERE id = $1
        LIMIT 1
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user profile")?;

    Ok(row.map(|row| read_profile(&row)))
}

pub(super) async fn register_user(
    pool: &PgPool,
    email: &str,
    hashed_password: &str,
    full_name: Option<&str>,
    verify_ttl_seconds: i64,
) -> Result<RegisterOutcome> {
    // Transaction keeps the user row and its verification token consistent.
    let mut tx = pool.begin().await.context("begin register transaction")?;

    let query = r#"
        INSERT INTO users (email, hashed_password, full_name)
        VALUES ($1, $2, $3)
        RETURNING id, email, full_name, is_active, is_superuser, is_verified,
               to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
               to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(hashed_password)
        .bind(full_name)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await;

    let profile = match row {
        Ok(row) => read_profile(&row),
        Err(err) => {
            if is_unique_violation(&err) {
                let _ = tx.rollback().await;
                return Ok(RegisterOutcome::Conflict);
            }
            return Err(err).context("failed to insert user");
        }
    };

    let verify_token =
        issue_token(&mut tx, TokenKind::Verification, profile.id, verify_ttl_seconds).await?;

    tx.commit().await.context("commit register transaction")?;

    Ok(RegisterOutcome::Created {
        profile,
        verify_token,
    })
}

/// Generate a raw token, retire the user's earlier tokens of the same kind,
/// and store only the new token's hash. Returns the raw value for the email
/// link.
pub(super) async fn issue_token(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    kind: TokenKind,
    user_id: Uuid,
    ttl_seconds: i64,
) -> Result<String> {
    let query = kind.invalidate_sql();
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to retire earlier tokens")?;

    let token = generate_token()?;
    let token_hash = hash_token(&token);

    let query = kind.insert_sql();
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(token_hash)
        .bind(ttl_seconds)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to insert token")?;

    Ok(token)
}

pub(super) async fn create_token(
    pool: &PgPool,
    kind: TokenKind,
    user_id: Uuid,
    ttl_seconds: i64,
) -> Result<String> {
    let mut tx = pool.begin().await.context("begin token transaction")?;
    let token = issue_token(&mut tx, kind, user_id, ttl_seconds).await?;
    tx.commit().await.context("commit token transaction")?;
    Ok(token)
}

/// Mark the token consumed if it is still unconsumed and unexpired. The
/// single conditional UPDATE guarantees at most one concurrent caller wins.
pub(super) async fn consume_token(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    kind: TokenKind,
    token_hash: &str,
) -> Result<Option<Uuid>> {
    let query = kind.consume_sql();
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to consume token")?;

    Ok(row.map(|row| row.get("user_id")))
}

/// Check whether a token would currently be accepted, without consuming it.
pub(super) async fn probe_token(pool: &PgPool, kind: TokenKind, token_hash: &str) -> Result<bool> {
    let query = kind.probe_sql();
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to probe token")?;

    Ok(row.is_some())
}

pub(super) async fn update_password(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    hashed_password: &str,
) -> Result<()> {
    let query = r"
        UPDATE users
        SET hashed_password = $2,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(hashed_password)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to update password")?;
    Ok(())
}

pub(super) async fn set_password(
    pool: &PgPool,
    user_id: Uuid,
    hashed_password: &str,
) -> Result<()> {
    let query = r"
        UPDATE users
        SET hashed_password = $2,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(hashed_password)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password")?;
    Ok(())
}

pub(super) async fn mark_email_verified(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
) -> Result<()> {
    let query = r"
        UPDATE users
        SET is_verified = TRUE,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to mark email verified")?;
    Ok(())
}

pub(crate) async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    email: Option<&str>,
    full_name: Option<&str>,
    verify_ttl_seconds: i64,
) -> Result<ProfileUpdateOutcome> {
    let mut tx = pool.begin().await.context("begin profile transaction")?;

    // Lock the row so the email comparison stays valid for the whole update.
    let query = "SELECT email FROM users WHERE id = $1 FOR UPDATE";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to lock user row")?;

    let Some(row) = row else {
        let _ = tx.rollback().await;
        return Ok(ProfileUpdateOutcome::NotFound);
    };

    let current_email: String = row.get("email");
    let email_changed = email.is_some_and(|candidate| candidate != current_email);

    // A changed email drops verified status until the new address is confirmed.
    let query = r#"
        UPDATE users
        SET email = COALESCE($2, email),
            full_name = COALESCE($3, full_name),
            is_verified = CASE WHEN $4 THEN FALSE ELSE is_verified END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, email, full_name, is_active, is_superuser, is_verified,
               to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
               to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(email)
        .bind(full_name)
        .bind(email_changed)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await;

    let profile = match row {
        Ok(row) => read_profile(&row),
        Err(err) => {
            if is_unique_violation(&err) {
                let _ = tx.rollback().await;
                return Ok(ProfileUpdateOutcome::EmailTaken);
            }
            return Err(err).context("failed to update profile");
        }
    };

    let verify_token = if email_changed {
        Some(issue_token(&mut tx, TokenKind::Verification, user_id, verify_ttl_seconds).await?)
    } else {
        None
    };

    tx.commit().await.context("commit profile transaction")?;

    Ok(ProfileUpdateOutcome::Updated {
        profile,
        verify_token,
    })
}

pub(crate) async fn list_users(
    pool: &PgPool,
    q: Option<&str>,
    is_active: Option<bool>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<UserProfile>, i64)> {
    let query = r#"
        SELECT id, email, full_name, is_active, is_superuser, is_verified,
               to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
               to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
        FROM users
        WHERE ($1::text IS NULL
               OR email ILIKE '%' || $1 || '%'
               OR COALESCE(full_name, '') ILIKE '%' || $1 || '%')
          AND ($2::boolean IS NULL OR is_active = $2)
        ORDER BY created_at DESC, id
        LIMIT $3 OFFSET $4
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(q)
        .bind(is_active)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list users")?;

    let items = rows.iter().map(read_profile).collect();

    let query = r"
        SELECT COUNT(*) AS total
        FROM users
        WHERE ($1::text IS NULL
               OR email ILIKE '%' || $1 || '%'
               OR COALESCE(full_name, '') ILIKE '%' || $1 || '%')
          AND ($2::boolean IS NULL OR is_active = $2)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(q)
        .bind(is_active)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to count users")?;

    let total: i64 = row.get("total");
    Ok((items, total))
}

pub(crate) async fn admin_update_user(
    pool: &PgPool,
    user_id: Uuid,
    full_name: Option<&str>,
    is_active: Option<bool>,
    is_superuser: Option<bool>,
    is_verified: Option<bool>,
) -> Result<Option<UserProfile>> {
    let query = r#"
        UPDATE users
        SET full_name = COALESCE($2, full_name),
            is_active = COALESCE($3, is_active),
            is_superuser = COALESCE($4, is_superuser),
            is_verified = COALESCE($5, is_verified),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, email, full_name, is_active, is_superuser, is_verified,
               to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
               to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(full_name)
        .bind(is_active)
        .bind(is_superuser)
        .bind(is_verified)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update user")?;

    Ok(row.map(|row| read_profile(&row)))
}

pub(crate) async fn delete_user(pool: &PgPool, user_id: Uuid) -> Result<bool> {
    let query = "DELETE FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete user")?;

    Ok(result.rows_affected() > 0)
}
