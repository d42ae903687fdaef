//! Authenticated principal extraction and the route guard.
//!
//! Flow Overview: read the session token, resolve it to an identity and its
//! profile, then evaluate the shared guard for the route being served.

use axum::http::HeaderMap;
use sqlx::PgPool;

use super::{session::authenticate_session, storage::fetch_profile_by_user};
use crate::api::handlers::ServiceError;
use crate::rbac::{routes::Route, AccessDecision, Profile, SessionState};

/// Authenticated caller derived from the session token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: uuid::Uuid,
    pub email: String,
    pub profile: Option<Profile>,
}

impl Principal {
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        SessionState::SignedIn {
            profile: self.profile.clone(),
        }
    }
}

/// Resolve the caller, `None` when there is no valid session.
///
/// # Errors
/// Returns `500` if the session or profile lookup fails.
pub async fn current_principal(
    headers: &HeaderMap,
    pool: &PgPool,
) -> Result<Option<Principal>, ServiceError> {
    let Some(record) = authenticate_session(headers, pool).await? else {
        return Ok(None);
    };
    let profile = fetch_profile_by_user(pool, record.user_id).await?;
    Ok(Some(Principal {
        user_id: record.user_id,
        email: record.email,
        profile,
    }))
}

/// Resolve a session into a principal, or `401` when it is missing.
///
/// # Errors
/// Returns `401` without a session, `500` on lookup failures.
pub async fn require_auth(headers: &HeaderMap, pool: &PgPool) -> Result<Principal, ServiceError> {
    current_principal(headers, pool)
        .await?
        .ok_or(ServiceError::Unauthorized)
}

/// Session state as seen by the guard.
#[must_use]
pub fn session_state(principal: Option<&Principal>) -> SessionState {
    principal.map_or(SessionState::SignedOut, Principal::session_state)
}

/// Map a guard decision onto the transport.
///
/// # Errors
/// `RedirectToLogin` (and the client-only `Loading`) become `401`, `Deny` becomes `403`.
pub fn enforce(decision: AccessDecision) -> Result<(), ServiceError> {
    match decision {
        AccessDecision::Allow => Ok(()),
        AccessDecision::Loading | AccessDecision::RedirectToLogin => {
            Err(ServiceError::Unauthorized)
        }
        AccessDecision::Deny => Err(ServiceError::Forbidden),
    }
}

/// Authenticate and authorize the caller for a protected route.
///
/// # Errors
/// Returns `401`/`403` per [`enforce`], or `500` on lookup failures.
pub async fn require_route(
    headers: &HeaderMap,
    pool: &PgPool,
    route: Route,
) -> Result<Principal, ServiceError> {
    let principal = current_principal(headers, pool).await?;
    enforce(route.access(&session_state(principal.as_ref())))?;
    principal.ok_or(ServiceError::Unauthorized)
}
