//! Staff profile management endpoints.
//!
//! Flow Overview:
//! 1) Resolve the session and require the admin-only users route.
//! 2) Validate the payload before any database call.
//! 3) Create provisions identity and profile in one transaction; updates only
//!    touch `full_name`, `role` and `is_active`; delete removes the identity so
//!    its profile and sessions cascade.

use anyhow::Context;
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Deserializer};
use sqlx::PgPool;
use tracing::{info, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    auth::{
        require_route,
        storage::{
            create_identity, profile_columns, profile_from_row, CreateIdentityOutcome, NewIdentity,
        },
        utils::{hash_password, normalize_email},
    },
    db_span, normalize_optional, parse_id, valid_email, JsonBody, ServiceError,
};
use crate::rbac::{routes::Route, Profile, Role};

const ROUTE: Route = Route::AdminUsers;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub full_name: Option<String>,
    /// `admin`, `owner` or `user`. Defaults to `user`.
    pub role: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

impl CreateUserRequest {
    /// # Errors
    /// Returns `400` with the first failing rule.
    pub fn validate(self) -> Result<NewUser, ServiceError> {
        let email = normalize_email(&self.email);
        if email.is_empty() {
            return Err(ServiceError::bad_request("Email is required"));
        }
        if !valid_email(&email) {
            return Err(ServiceError::bad_request("Invalid email address"));
        }
        if self.password.is_empty() {
            return Err(ServiceError::bad_request("Password is required for new users"));
        }
        let role = parse_role(self.role.as_deref())?.unwrap_or(Role::User);
        let full_name = normalize_optional(self.full_name).unwrap_or_else(|| email.clone());
        Ok(NewUser {
            email,
            password: self.password,
            full_name,
            role,
        })
    }
}

/// Profile fields an admin may change. Passwords are not accepted here.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    /// `null` or an empty string clears the name; absent leaves it unchanged.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub full_name: Option<Option<String>>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    /// `Some(None)` clears the column.
    pub full_name: Option<Option<String>>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    /// # Errors
    /// Returns `400` for an unknown role.
    pub fn validate(self) -> Result<ProfileChanges, ServiceError> {
        Ok(ProfileChanges {
            full_name: self.full_name.map(normalize_optional),
            role: parse_role(self.role.as_deref())?,
            is_active: self.is_active,
        })
    }
}

// Wraps any present value, `null` included, so only an absent field stays `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn parse_role(role: Option<&str>) -> Result<Option<Role>, ServiceError> {
    match role.map(str::trim) {
        None | Some("") => Ok(None),
        Some(role) => role
            .parse()
            .map(Some)
            .map_err(|_| ServiceError::bad_request("Invalid role")),
    }
}

#[utoipa::path(
    get,
    path = "/v1/users",
    responses(
        (status = 200, description = "All profiles, newest first", body = [Profile]),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
    ),
    tag = "users"
)]
pub async fn list_users(
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, ROUTE).await?;
    let query = concat!("SELECT ", profile_columns!(), " FROM profiles ORDER BY created_at DESC");
    let rows = sqlx::query(query)
        .fetch_all(&*pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to list profiles")?;
    let profiles = rows
        .iter()
        .map(profile_from_row)
        .collect::<anyhow::Result<Vec<Profile>>>()?;
    Ok((StatusCode::OK, Json(profiles)))
}

#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Identity and profile created", body = Profile),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
        (status = 409, description = "Email already registered"),
    ),
    tag = "users"
)]
pub async fn create_user(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, ROUTE).await?;
    let user = request.validate()?;
    let password_hash = hash_password(&user.password)?;

    let outcome = create_identity(
        &pool,
        NewIdentity {
            email: &user.email,
            password_hash: &password_hash,
            full_name: &user.full_name,
            role: user.role,
        },
    )
    .await?;

    match outcome {
        CreateIdentityOutcome::Created(profile) => {
            info!(profile_id = %profile.id, role = %profile.role, "user created");
            Ok((StatusCode::CREATED, Json(profile)))
        }
        CreateIdentityOutcome::Conflict => Err(ServiceError::Conflict(
            "A user with this email already exists".to_string(),
        )),
    }
}

#[utoipa::path(
    patch,
    path = "/v1/users/{id}",
    params(("id" = String, Path, description = "Profile id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = Profile),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
        (status = 404, description = "Profile not found"),
    ),
    tag = "users"
)]
pub async fn update_user(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, ROUTE).await?;
    let id = parse_id(&id)?;
    let changes = request.validate()?;
    let profile = update_profile(&pool, id, &changes)
        .await?
        .ok_or(ServiceError::NotFound)?;
    info!(profile_id = %profile.id, "profile updated");
    Ok((StatusCode::OK, Json(profile)))
}

#[utoipa::path(
    delete,
    path = "/v1/users/{id}",
    params(("id" = String, Path, description = "Profile id")),
    responses(
        (status = 204, description = "Identity and profile deleted"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
        (status = 404, description = "Profile not found"),
    ),
    tag = "users"
)]
pub async fn delete_user(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, ROUTE).await?;
    let id = parse_id(&id)?;
    let query = "DELETE FROM users WHERE id = (SELECT user_id FROM profiles WHERE id = $1)";
    let result = sqlx::query(query)
        .bind(id)
        .execute(&*pool)
        .instrument(db_span("DELETE", query))
        .await
        .context("failed to delete user")?;
    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }
    info!(profile_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    changes: &ProfileChanges,
) -> anyhow::Result<Option<Profile>> {
    let query = concat!(
        r"UPDATE profiles SET
            full_name = CASE WHEN $2 THEN $3 ELSE full_name END,
            role = COALESCE($4::user_role, role),
            is_active = COALESCE($5, is_active)
        WHERE id = $1
        RETURNING ",
        profile_columns!()
    );
    let row = sqlx::query(query)
        .bind(id)
        .bind(changes.full_name.is_some())
        .bind(changes.full_name.clone().flatten())
        .bind(changes.role.map(Role::as_str))
        .bind(changes.is_active)
        .fetch_optional(pool)
        .instrument(db_span("UPDATE", query))
        .await
        .context("failed to update profile")?;
    row.as_ref().map(profile_from_row).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message<T: std::fmt::Debug>(result: Result<T, ServiceError>) -> String {
        match result {
            Err(ServiceError::BadRequest(message)) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn request(email: &str, password: &str, role: Option<&str>) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: None,
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn create_rules_apply_in_order() {
        assert_eq!(message(request("", "", None).validate()), "Email is required");
        assert_eq!(
            message(request("not-an-email", "", None).validate()),
            "Invalid email address"
        );
        assert_eq!(
            message(request("staff@hiwajamil.com", "", None).validate()),
            "Password is required for new users"
        );
        assert_eq!(
            message(request("staff@hiwajamil.com", "secret", Some("root")).validate()),
            "Invalid role"
        );
    }

    #[test]
    fn create_defaults_name_and_role() -> Result<(), ServiceError> {
        let user = request(" Staff@HiwaJamil.com ", "secret", None).validate()?;
        assert_eq!(user.email, "staff@hiwajamil.com");
        assert_eq!(user.full_name, "staff@hiwajamil.com");
        assert_eq!(user.role, Role::User);
        Ok(())
    }

    #[test]
    fn create_keeps_explicit_name_and_role() -> Result<(), ServiceError> {
        let user = CreateUserRequest {
            full_name: Some(" Hiwa Jamil ".to_string()),
            ..request("owner@hiwajamil.com", "secret", Some("Owner"))
        }
        .validate()?;
        assert_eq!(user.full_name, "Hiwa Jamil");
        assert_eq!(user.role, Role::Owner);
        Ok(())
    }

    #[test]
    fn update_distinguishes_clear_from_unchanged() -> Result<(), ServiceError> {
        let cleared = UpdateUserRequest {
            full_name: Some(Some("  ".to_string())),
            ..UpdateUserRequest::default()
        }
        .validate()?;
        assert_eq!(cleared.full_name, Some(None));

        let untouched = UpdateUserRequest {
            is_active: Some(false),
            ..UpdateUserRequest::default()
        }
        .validate()?;
        assert_eq!(untouched.full_name, None);
        assert_eq!(untouched.is_active, Some(false));
        Ok(())
    }

    #[test]
    fn update_null_name_clears_and_absent_name_is_kept() -> anyhow::Result<()> {
        let cleared: UpdateUserRequest =
            serde_json::from_value(serde_json::json!({"full_name": null}))?;
        assert_eq!(cleared.validate()?.full_name, Some(None));

        let untouched: UpdateUserRequest =
            serde_json::from_value(serde_json::json!({"is_active": true}))?;
        assert_eq!(untouched.validate()?.full_name, None);

        let renamed: UpdateUserRequest =
            serde_json::from_value(serde_json::json!({"full_name": " Hiwa "}))?;
        assert_eq!(renamed.validate()?.full_name, Some(Some("Hiwa".to_string())));
        Ok(())
    }

    #[test]
    fn update_rejects_unknown_role() {
        let request = UpdateUserRequest {
            role: Some("superuser".to_string()),
            ..UpdateUserRequest::default()
        };
        assert_eq!(message(request.validate()), "Invalid role");
    }

    #[test]
    fn update_rejects_password_field() {
        let parsed: Result<UpdateUserRequest, _> =
            serde_json::from_value(serde_json::json!({"password": "new-secret"}));
        assert!(parsed.is_err());
    }
}
