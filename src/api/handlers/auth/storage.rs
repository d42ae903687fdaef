//! Database helpers for identities, sessions and profiles.

use anyhow::{anyhow, Context, Result};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::utils::{generate_session_token, hash_session_token};
use crate::api::handlers::{db_span, is_unique_violation};
use crate::rbac::{Profile, Role};

/// Profile columns rendered for [`profile_from_row`].
macro_rules! profile_columns {
    () => {
        r#"id, user_id, email, full_name, role::text AS role, is_active,
           to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
           to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at"#
    };
}
pub(crate) use profile_columns;

/// Unknown role strings fail here rather than being coerced.
pub(crate) fn profile_from_row(row: &PgRow) -> Result<Profile> {
    let role: String = row.get("role");
    Ok(Profile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        role: role.parse::<Role>()?,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Data needed to verify a password sign-in.
pub(super) struct Credentials {
    pub(super) user_id: Uuid,
    pub(super) email: String,
    pub(super) password_hash: String,
}

/// Minimal data returned for a valid session token.
pub(crate) struct SessionRecord {
    pub(crate) user_id: Uuid,
    pub(crate) email: String,
}

/// Identity and profile fields for a new account.
pub(crate) struct NewIdentity<'a> {
    pub(crate) email: &'a str,
    pub(crate) password_hash: &'a str,
    pub(crate) full_name: &'a str,
    pub(crate) role: Role,
}

#[derive(Debug)]
pub(crate) enum CreateIdentityOutcome {
    Created(Profile),
    Conflict,
}

pub(super) async fn lookup_credentials(pool: &PgPool, email: &str) -> Result<Option<Credentials>> {
    let query = "SELECT id, email, password_hash FROM users WHERE email = $1";
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to lookup credentials")?;

    Ok(row.map(|row| Credentials {
        user_id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
    }))
}

/// Insert a session and return the raw token for the cookie.
pub(super) async fn create_session(
    pool: &PgPool,
    user_id: Uuid,
    ttl_seconds: i64,
) -> Result<String> {
    let token = generate_session_token()?;
    let token_hash = hash_session_token(&token);
    let query = r"
        INSERT INTO sessions (user_id, token_hash, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    sqlx::query(query)
        .bind(user_id)
        .bind(token_hash)
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(db_span("INSERT", query))
        .await
        .context("failed to insert session")?;
    Ok(token)
}

/// Expired sessions are treated as absent.
pub(crate) async fn lookup_session(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<SessionRecord>> {
    let query = r"
        SELECT users.id, users.email
        FROM sessions
        JOIN users ON users.id = sessions.user_id
        WHERE sessions.token_hash = $1 AND sessions.expires_at > NOW()
    ";
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to lookup session")?;

    Ok(row.map(|row| SessionRecord {
        user_id: row.get("id"),
        email: row.get("email"),
    }))
}

pub(super) async fn delete_session(pool: &PgPool, token_hash: &[u8]) -> Result<()> {
    let query = "DELETE FROM sessions WHERE token_hash = $1";
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(db_span("DELETE", query))
        .await
        .context("failed to delete session")?;
    Ok(())
}

pub(crate) async fn fetch_profile_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Profile>> {
    let query = concat!("SELECT ", profile_columns!(), " FROM profiles WHERE user_id = $1");
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to fetch profile")?;
    row.as_ref().map(profile_from_row).transpose()
}

/// Create the identity and its profile in one transaction.
pub(crate) async fn create_identity(
    pool: &PgPool,
    identity: NewIdentity<'_>,
) -> Result<CreateIdentityOutcome> {
    let mut tx = pool.begin().await.context("begin create identity transaction")?;

    let query = "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id";
    let row = sqlx::query(query)
        .bind(identity.email)
        .bind(identity.password_hash)
        .fetch_one(&mut *tx)
        .instrument(db_span("INSERT", query))
        .await;

    let user_id: Uuid = match row {
        Ok(row) => row.get("id"),
        Err(err) => {
            if is_unique_violation(&err) {
                // Dropping `tx` rolls the aborted transaction back.
                return Ok(CreateIdentityOutcome::Conflict);
            }
            return Err(err).context("failed to insert user");
        }
    };

    let query = concat!(
        r"INSERT INTO profiles (user_id, email, full_name, role)
        VALUES ($1, $2, $3, $4::user_role)
        RETURNING ",
        profile_columns!()
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(identity.email)
        .bind(identity.full_name)
        .bind(identity.role.as_str())
        .fetch_one(&mut *tx)
        .instrument(db_span("INSERT", query))
        .await
        .context("failed to insert profile")?;
    let profile = profile_from_row(&row)?;

    tx.commit().await.context("commit create identity transaction")?;

    Ok(CreateIdentityOutcome::Created(profile))
}

pub(crate) async fn admin_profile_exists(pool: &PgPool) -> Result<bool> {
    let query =
        "SELECT EXISTS (SELECT 1 FROM profiles WHERE role = 'admin' AND is_active) AS present";
    let row = sqlx::query(query)
        .fetch_one(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to check for admin profiles")?;
    Ok(row.get("present"))
}

/// Promote an existing identity's profile to an active admin.
pub(crate) async fn promote_to_admin(pool: &PgPool, email: &str) -> Result<()> {
    let query = r"
        UPDATE profiles SET role = 'admin', is_active = TRUE
        WHERE user_id = (SELECT id FROM users WHERE email = $1)
    ";
    let result = sqlx::query(query)
        .bind(email)
        .execute(pool)
        .instrument(db_span("UPDATE", query))
        .await
        .context("failed to promote admin")?;
    if result.rows_affected() == 0 {
        return Err(anyhow!("no profile found for {email}"));
    }
    Ok(())
}
