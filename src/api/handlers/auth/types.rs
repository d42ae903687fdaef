//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::rbac::{routes::Route, AccessDecision, Profile};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
    /// `null` when the identity has no profile yet.
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccessQuery {
    /// Frontend path to evaluate, e.g. `/admin/users`.
    pub path: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct AccessResponse {
    pub route: Route,
    pub decision: AccessDecision,
    /// Where to send the caller instead of rendering the route.
    pub redirect: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn session_response_serializes_missing_profile_as_null() -> Result<()> {
        let response = SessionResponse {
            user_id: "u".to_string(),
            email: "a@b.co".to_string(),
            profile: None,
        };
        let value = serde_json::to_value(&response)?;
        assert!(value.get("profile").is_some_and(serde_json::Value::is_null));
        Ok(())
    }

    #[test]
    fn access_response_uses_snake_case() -> Result<()> {
        let response = AccessResponse {
            route: Route::AdminUsers,
            decision: AccessDecision::RedirectToLogin,
            redirect: Some("/admin/login".to_string()),
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(value["route"], "admin_users");
        assert_eq!(value["decision"], "redirect_to_login");
        Ok(())
    }
}
