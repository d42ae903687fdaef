//! Website copy: admin CRUD plus the public resolved views.
//!
//! Every successful mutation rebuilds the loaded per-language maps so public
//! reads pick up the change without a restart. A refresh failure after a
//! committed write is logged and does not fail the request; the next
//! mutation or `POST /v1/admin/content/refresh` retries it.

pub mod storage;
pub mod types;

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};

use super::{auth::require_route, parse_id, JsonBody, LanguageQuery, ServiceError};
use crate::content::{ContentCatalog, ContentItem};
use crate::rbac::routes::Route;
use types::{ContentInput, ContentResponse, SectionResponse};

pub use storage::PgContentSource;

const ROUTE: Route = Route::AdminContent;

async fn refresh_after_write(catalog: &ContentCatalog) {
    if let Err(err) = catalog.refresh_all().await {
        error!("Failed to refresh content maps: {err:#}");
    }
}

#[utoipa::path(
    get,
    path = "/v1/content",
    params(LanguageQuery),
    responses(
        (status = 200, description = "Resolved copy for the language", body = ContentResponse),
        (status = 400, description = "Unsupported language"),
    ),
    tag = "content"
)]
pub async fn public_content(
    Query(query): Query<LanguageQuery>,
    catalog: Extension<Arc<ContentCatalog>>,
) -> Result<impl IntoResponse, ServiceError> {
    let language = query.language()?;
    let map = catalog.map(language).await;
    Ok(Json(ContentResponse {
        language,
        content: (*map).clone(),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/content/{section}",
    params(
        ("section" = String, Path, description = "Content section"),
        LanguageQuery
    ),
    responses(
        (
            status = 200,
            description = "Resolved keys of one section; empty when absent",
            body = SectionResponse
        ),
        (status = 400, description = "Unsupported language"),
    ),
    tag = "content"
)]
pub async fn public_section(
    Path(section): Path<String>,
    Query(query): Query<LanguageQuery>,
    catalog: Extension<Arc<ContentCatalog>>,
) -> Result<impl IntoResponse, ServiceError> {
    let language = query.language()?;
    let map = catalog.map(language).await;
    let content = map.get_section(&section);
    Ok(Json(SectionResponse {
        language,
        section,
        content,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/admin/content",
    responses(
        (
            status = 200,
            description = "Every entry ordered by section and key",
            body = [ContentItem]
        ),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
    ),
    tag = "content"
)]
pub async fn list_content(
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, ROUTE).await?;
    let items = storage::list_items(&pool).await?;
    Ok((StatusCode::OK, Json(items)))
}

#[utoipa::path(
    post,
    path = "/v1/admin/content",
    request_body = ContentInput,
    responses(
        (status = 201, description = "Entry created", body = ContentItem),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
    ),
    tag = "content"
)]
pub async fn create_content(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    catalog: Extension<Arc<ContentCatalog>>,
    JsonBody(input): JsonBody<ContentInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let principal = require_route(&headers, &pool, ROUTE).await?;
    let fields = input.validate()?;
    let item = storage::insert_item(&pool, &fields, principal.user_id).await?;
    info!(content_id = %item.id, section = %item.section, key = %item.key, "content created");
    refresh_after_write(&catalog).await;
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    put,
    path = "/v1/admin/content/{id}",
    params(("id" = String, Path, description = "Content id")),
    request_body = ContentInput,
    responses(
        (status = 200, description = "Entry updated", body = ContentItem),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
        (status = 404, description = "Entry not found"),
    ),
    tag = "content"
)]
pub async fn update_content(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    catalog: Extension<Arc<ContentCatalog>>,
    JsonBody(input): JsonBody<ContentInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let principal = require_route(&headers, &pool, ROUTE).await?;
    let id = parse_id(&id)?;
    let fields = input.validate()?;
    let item = storage::update_item(&pool, id, &fields, principal.user_id)
        .await?
        .ok_or(ServiceError::NotFound)?;
    refresh_after_write(&catalog).await;
    Ok((StatusCode::OK, Json(item)))
}

#[utoipa::path(
    delete,
    path = "/v1/admin/content/{id}",
    params(("id" = String, Path, description = "Content id")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
        (status = 404, description = "Entry not found"),
    ),
    tag = "content"
)]
pub async fn delete_content(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    catalog: Extension<Arc<ContentCatalog>>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, ROUTE).await?;
    let id = parse_id(&id)?;
    if !storage::delete_item(&pool, id).await? {
        return Err(ServiceError::NotFound);
    }
    info!(content_id = %id, "content deleted");
    refresh_after_write(&catalog).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/v1/admin/content/refresh",
    responses(
        (status = 204, description = "Loaded language maps rebuilt"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
    ),
    tag = "content"
)]
pub async fn refresh_content(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    catalog: Extension<Arc<ContentCatalog>>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, ROUTE).await?;
    catalog.refresh_all().await?;
    Ok(StatusCode::NO_CONTENT)
}
