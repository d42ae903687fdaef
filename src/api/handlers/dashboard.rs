//! Dashboard summary counts.

use anyhow::Context;
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use utoipa::ToSchema;

use super::{auth::require_route, db_span, ServiceError};
use crate::rbac::routes::Route;

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub products: i64,
    pub brands: i64,
    pub partners: i64,
    pub content: i64,
}

#[utoipa::path(
    get,
    path = "/v1/dashboard/stats",
    responses(
        (status = 200, description = "Row counts per resource", body = DashboardStats),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
    ),
    tag = "admin"
)]
pub async fn stats(
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, Route::AdminDashboard).await?;

    let query = r"
        SELECT
            (SELECT COUNT(*) FROM products) AS products,
            (SELECT COUNT(*) FROM brands) AS brands,
            (SELECT COUNT(*) FROM partners) AS partners,
            (SELECT COUNT(*) FROM website_content) AS content
    ";
    let row = sqlx::query(query)
        .fetch_one(&*pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to count dashboard rows")?;

    let stats = DashboardStats {
        products: row.get("products"),
        brands: row.get("brands"),
        partners: row.get("partners"),
        content: row.get("content"),
    };
    Ok((StatusCode::OK, Json(stats)))
}
