//! Guard evaluation for frontend routes and the admin sidebar.

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;

use super::{
    principal::{current_principal, require_auth, session_state},
    types::{AccessQuery, AccessResponse},
};
use crate::api::handlers::ServiceError;
use crate::rbac::routes::{navigation as sidebar, NavItem, Route};

#[utoipa::path(
    get,
    path = "/v1/auth/access",
    params(AccessQuery),
    responses(
        (
            status = 200,
            description = "Guard decision for the caller on the given path",
            body = AccessResponse
        )
    ),
    tag = "auth"
)]
pub async fn access(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    Query(query): Query<AccessQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let principal = current_principal(&headers, &pool).await?;
    Ok((StatusCode::OK, Json(evaluate(&query.path, principal.as_ref()))))
}

fn evaluate(path: &str, principal: Option<&super::principal::Principal>) -> AccessResponse {
    let route = Route::resolve(path);
    let decision = route.access(&session_state(principal));
    AccessResponse {
        route,
        decision,
        redirect: route.redirect(decision).map(str::to_string),
    }
}

#[utoipa::path(
    get,
    path = "/v1/admin/navigation",
    responses(
        (status = 200, description = "Sidebar entries the caller may open", body = [NavItem]),
        (status = 401, description = "Missing session or profile")
    ),
    tag = "admin"
)]
pub async fn navigation(
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ServiceError> {
    let principal = require_auth(&headers, &pool).await?;
    let profile = principal.profile.ok_or(ServiceError::Unauthorized)?;
    Ok((StatusCode::OK, Json(sidebar(&profile))))
}
