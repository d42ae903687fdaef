//! Session endpoints for cookie and bearer auth.

use anyhow::Result;
use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::{
    principal::current_principal,
    state::{AuthConfig, AuthState},
    storage::{delete_session, lookup_session, SessionRecord},
    types::SessionResponse,
    utils::hash_session_token,
};

pub(crate) const SESSION_COOKIE_NAME: &str = "hiwa_session";

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, pool: Extension<PgPool>) -> impl IntoResponse {
    match current_principal(&headers, &pool).await {
        Ok(Some(principal)) => {
            let response = SessionResponse {
                user_id: principal.user_id.to_string(),
                email: principal.email,
                profile: principal.profile,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Resolve the session token into a session record, if present.
///
/// Returns `Ok(None)` when the token is missing, unknown or expired.
pub(crate) async fn authenticate_session(
    headers: &HeaderMap,
    pool: &PgPool,
) -> Result<Option<SessionRecord>> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };
    lookup_session(pool, &hash_session_token(&token)).await
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        let token_hash = hash_session_token(&token);
        if let Err(err) = delete_session(&pool, &token_hash).await {
            error!("Failed to delete session: {err:#}");
        }
    }

    // The cookie is cleared even when no session row matched.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Bearer tokens take precedence over the cookie.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
            .then(|| val.trim().to_string())
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(name: axum::http::HeaderName, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn extracts_cookie_among_others() {
        let headers = headers(COOKIE, "theme=dark; hiwa_session=abc123; lang=ar");
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn bearer_token_wins_over_cookie() {
        let mut headers = headers(COOKIE, "hiwa_session=cookie");
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header"));
        assert_eq!(extract_session_token(&headers), Some("header".to_string()));
    }

    #[test]
    fn empty_values_are_ignored() {
        assert_eq!(extract_session_token(&headers(COOKIE, "hiwa_session=")), None);
        assert_eq!(extract_session_token(&headers(AUTHORIZATION, "Bearer   ")), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn session_cookie_attributes() -> anyhow::Result<()> {
        let config = AuthConfig::new("http://localhost:5173".to_string())
            .with_session_ttl_seconds(60);
        let cookie = session_cookie(&config, "tok")?;
        assert_eq!(
            cookie.to_str()?,
            "hiwa_session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );
        Ok(())
    }

    #[test]
    fn secure_flag_follows_frontend_scheme() -> anyhow::Result<()> {
        let config = AuthConfig::new("https://hiwajamil.com".to_string());
        assert!(session_cookie(&config, "tok")?.to_str()?.ends_with("; Secure"));
        assert!(clear_session_cookie(&config)?.to_str()?.contains("Max-Age=0"));
        Ok(())
    }
}
