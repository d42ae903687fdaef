//! Password sign-in.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};

use super::{
    session::session_cookie,
    state::AuthState,
    storage::{create_session, fetch_profile_by_user, lookup_credentials},
    types::{LoginRequest, SessionResponse},
    utils::{normalize_email, verify_password},
};
use crate::api::handlers::{JsonBody, ServiceError};

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = SessionResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid email or password")
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let email = normalize_email(&request.email);
    if email.is_empty() {
        return Err(ServiceError::bad_request("Email is required"));
    }
    if request.password.is_empty() {
        return Err(ServiceError::bad_request("Password is required"));
    }

    let credentials = lookup_credentials(&pool, &email)
        .await?
        .filter(|credentials| verify_password(&request.password, &credentials.password_hash))
        .ok_or_else(|| invalid_credentials(&email))?;

    let config = auth_state.config();
    let token = create_session(&pool, credentials.user_id, config.session_ttl_seconds()).await?;
    let profile = fetch_profile_by_user(&pool, credentials.user_id).await?;

    let mut headers = HeaderMap::new();
    match session_cookie(config, &token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return Err(ServiceError::Internal(err.into()));
        }
    }

    info!(user_id = %credentials.user_id, "signed in");

    let response = SessionResponse {
        user_id: credentials.user_id.to_string(),
        email: credentials.email,
        profile,
    };
    Ok((StatusCode::OK, headers, Json(response)))
}

fn invalid_credentials(email: &str) -> ServiceError {
    info!(email, "sign-in rejected");
    ServiceError::InvalidCredentials
}
