//! Role-based access control for the admin dashboard.
//!
//! Every protected route declares a static set of permitted roles (see
//! [`routes::Route::required_roles`]) and every access check goes through
//! [`authorize`]. There is no policy engine, no wildcard and no inheritance:
//! a profile is either a member of the route's role set or it is denied.
//!
//! Flow Overview:
//! 1) Resolve the caller's session into a [`SessionState`].
//! 2) Look up the route's role set.
//! 3) Call [`authorize`] and map the [`AccessDecision`] onto the transport
//!    (HTTP status, redirect, or "access denied" screen).

pub mod routes;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

/// Application role stored on a profile.
///
/// Variants are declared from least to most privileged so the derived `Ord`
/// follows `user < owner < admin`. Access checks never compare ranks; they use
/// set membership.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Owner,
    Admin,
}

impl Role {
    pub const ALL: [Self; 3] = [Self::Admin, Self::Owner, Self::User];

    /// Returns the canonical string used in API payloads and the `user_role` SQL enum.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Owner => "owner",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            "user" => Ok(Self::User),
            _ => Err(UnknownRole(value.to_string())),
        }
    }
}

/// Application-level user record, distinct from the login identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// What is known about the caller when a protected route is evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Session hydration has not completed yet.
    Loading,
    /// Hydration completed and there is no valid session.
    SignedOut,
    /// A valid session exists; the profile may still be missing.
    SignedIn { profile: Option<Profile> },
}

impl SessionState {
    #[must_use]
    pub fn signed_in(profile: Profile) -> Self {
        Self::SignedIn {
            profile: Some(profile),
        }
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::SignedIn { profile } => profile.as_ref(),
            Self::Loading | Self::SignedOut => None,
        }
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    /// Render the protected view.
    Allow,
    /// Session still loading; show a spinner, not an error.
    Loading,
    /// No session; send the caller to the login page.
    RedirectToLogin,
    /// Authenticated but not permitted (wrong role or inactive profile).
    Deny,
}

impl AccessDecision {
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decide whether the caller may open a route guarded by `required_roles`.
///
/// Inactive profiles are denied for every role set.
#[must_use]
pub fn authorize(state: &SessionState, required_roles: &[Role]) -> AccessDecision {
    match state {
        SessionState::Loading => AccessDecision::Loading,
        SessionState::SignedOut | SessionState::SignedIn { profile: None } => {
            AccessDecision::RedirectToLogin
        }
        SessionState::SignedIn {
            profile: Some(profile),
        } => {
            if !profile.is_active || !required_roles.contains(&profile.role) {
                AccessDecision::Deny
            } else {
                AccessDecision::Allow
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::profile;
    use super::*;

    #[test]
    fn role_parses_trimmed_case_insensitive() {
        assert_eq!(" Admin ".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("OWNER".parse::<Role>(), Ok(Role::Owner));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
    }

    #[test]
    fn role_rejects_unknown_values() {
        assert!("superuser".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn role_order_follows_privilege() {
        assert!(Role::User < Role::Owner);
        assert!(Role::Owner < Role::Admin);
    }

    #[test]
    fn role_serializes_lowercase() -> anyhow::Result<()> {
        let value = serde_json::to_value(Role::Owner)?;
        assert_eq!(value, serde_json::json!("owner"));
        let decoded: Role = serde_json::from_value(serde_json::json!("admin"))?;
        assert_eq!(decoded, Role::Admin);
        Ok(())
    }

    #[test]
    fn loading_state_is_transient() {
        assert_eq!(
            authorize(&SessionState::Loading, &[Role::Admin]),
            AccessDecision::Loading
        );
    }

    #[test]
    fn missing_session_redirects_regardless_of_roles() {
        for roles in [&[Role::Admin][..], &Role::ALL[..], &[][..]] {
            assert_eq!(
                authorize(&SessionState::SignedOut, roles),
                AccessDecision::RedirectToLogin
            );
        }
    }

    #[test]
    fn session_without_profile_redirects() {
        let state = SessionState::SignedIn { profile: None };
        assert_eq!(
            authorize(&state, &Role::ALL),
            AccessDecision::RedirectToLogin
        );
    }

    #[test]
    fn role_outside_set_is_denied() {
        let sets: [&[Role]; 4] = [
            &[Role::Admin],
            &[Role::Admin, Role::Owner],
            &[Role::Owner],
            &[],
        ];
        for set in sets {
            for role in Role::ALL {
                let state = SessionState::signed_in(profile(role, true));
                let decision = authorize(&state, set);
                if set.contains(&role) {
                    assert_eq!(decision, AccessDecision::Allow, "{role} in {set:?}");
                } else {
                    assert_eq!(decision, AccessDecision::Deny, "{role} not in {set:?}");
                }
            }
        }
    }

    #[test]
    fn inactive_profile_is_denied_even_for_admin() {
        let state = SessionState::signed_in(profile(Role::Admin, false));
        assert_eq!(authorize(&state, &Role::ALL), AccessDecision::Deny);
    }

    #[test]
    fn access_decision_serializes_snake_case() -> anyhow::Result<()> {
        let value = serde_json::to_value(AccessDecision::RedirectToLogin)?;
        assert_eq!(value, serde_json::json!("redirect_to_login"));
        Ok(())
    }
}
