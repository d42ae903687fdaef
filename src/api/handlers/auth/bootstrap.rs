//! First-admin provisioning at startup.

use anyhow::{bail, Context, Result};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::{info, warn};

use super::{
    storage::{
        admin_profile_exists, create_identity, promote_to_admin, CreateIdentityOutcome,
        NewIdentity,
    },
    utils::{hash_password, normalize_email},
};
use crate::api::handlers::valid_email;
use crate::cli::commands::auth::BootstrapAdmin;
use crate::rbac::Role;

/// Create the configured admin when no active admin profile exists yet.
///
/// # Errors
/// Returns an error if the email is invalid or the database writes fail.
pub async fn ensure_admin(pool: &PgPool, admin: &BootstrapAdmin) -> Result<()> {
    if admin_profile_exists(pool).await? {
        info!("admin profile present, skipping bootstrap");
        return Ok(());
    }

    let email = normalize_email(&admin.email);
    if !valid_email(&email) {
        bail!("invalid bootstrap admin email: {email}");
    }
    let password = admin.password.expose_secret();
    if password.is_empty() {
        bail!("bootstrap admin password is empty");
    }

    let password_hash = hash_password(password)?;
    let outcome = create_identity(
        pool,
        NewIdentity {
            email: &email,
            password_hash: &password_hash,
            full_name: &email,
            role: Role::Admin,
        },
    )
    .await
    .context("failed to create bootstrap admin")?;

    match outcome {
        CreateIdentityOutcome::Created(profile) => {
            info!(profile_id = %profile.id, email = %email, "bootstrap admin created");
        }
        CreateIdentityOutcome::Conflict => {
            warn!(email = %email, "identity already exists, promoting its profile to admin");
            promote_to_admin(pool, &email).await?;
        }
    }
    Ok(())
}
