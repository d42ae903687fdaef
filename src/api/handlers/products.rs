//! Product management endpoints.

use anyhow::Context;
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{info, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    auth::require_route, db_span, normalize_optional, normalize_required, parse_id, JsonBody,
    ServiceError,
};
use crate::rbac::routes::Route;

const ROUTE: Route = Route::AdminProducts;

macro_rules! product_columns {
    () => {
        r#"id, name_en, name_ar, name_ku, description_en, description_ar, description_ku,
           category, price, image_url, is_active, created_by,
           to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
           to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at"#
    };
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name_en: String,
    pub name_ar: Option<String>,
    pub name_ku: Option<String>,
    pub description_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_ku: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductInput {
    #[serde(default)]
    pub name_en: String,
    pub name_ar: Option<String>,
    pub name_ku: Option<String>,
    pub description_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_ku: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, PartialEq)]
pub struct ProductFields {
    pub name_en: String,
    pub name_ar: Option<String>,
    pub name_ku: Option<String>,
    pub description_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_ku: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub is_active: bool,
}

impl ProductInput {
    /// # Errors
    /// Returns `400` when the English name is blank or the price is negative
    /// or not a finite number.
    pub fn validate(self) -> Result<ProductFields, ServiceError> {
        let name_en = normalize_required(&self.name_en)
            .ok_or_else(|| ServiceError::bad_request("Product name is required"))?;
        if self.price.is_some_and(|price| !price.is_finite() || price < 0.0) {
            return Err(ServiceError::bad_request("Invalid price"));
        }
        Ok(ProductFields {
            name_en,
            name_ar: normalize_optional(self.name_ar),
            name_ku: normalize_optional(self.name_ku),
            description_en: normalize_optional(self.description_en),
            description_ar: normalize_optional(self.description_ar),
            description_ku: normalize_optional(self.description_ku),
            category: normalize_optional(self.category),
            price: self.price,
            image_url: normalize_optional(self.image_url),
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

fn product_from_row(row: &PgRow) -> Product {
    Product {
        id: row.get("id"),
        name_en: row.get("name_en"),
        name_ar: row.get("name_ar"),
        name_ku: row.get("name_ku"),
        description_en: row.get("description_en"),
        description_ar: row.get("description_ar"),
        description_ku: row.get("description_ku"),
        category: row.get("category"),
        price: row.get("price"),
        image_url: row.get("image_url"),
        is_active: row.get("is_active"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[utoipa::path(
    get,
    path = "/v1/products",
    responses(
        (status = 200, description = "All products, newest first", body = [Product]),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
    ),
    tag = "products"
)]
pub async fn list_products(
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, ROUTE).await?;
    let query = concat!("SELECT ", product_columns!(), " FROM products ORDER BY created_at DESC");
    let rows = sqlx::query(query)
        .fetch_all(&*pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to list products")?;
    let products: Vec<Product> = rows.iter().map(product_from_row).collect();
    Ok((StatusCode::OK, Json(products)))
}

#[utoipa::path(
    post,
    path = "/v1/products",
    request_body = ProductInput,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
    ),
    tag = "products"
)]
pub async fn create_product(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let principal = require_route(&headers, &pool, ROUTE).await?;
    let fields = input.validate()?;
    let query = concat!(
        r"INSERT INTO products
            (name_en, name_ar, name_ku, description_en, description_ar, description_ku,
             category, price, image_url, is_active, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING ",
        product_columns!()
    );
    let row = sqlx::query(query)
        .bind(&fields.name_en)
        .bind(&fields.name_ar)
        .bind(&fields.name_ku)
        .bind(&fields.description_en)
        .bind(&fields.description_ar)
        .bind(&fields.description_ku)
        .bind(&fields.category)
        .bind(fields.price)
        .bind(&fields.image_url)
        .bind(fields.is_active)
        .bind(principal.user_id)
        .fetch_one(&*pool)
        .instrument(db_span("INSERT", query))
        .await
        .context("failed to insert product")?;
    let product = product_from_row(&row);
    info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    put,
    path = "/v1/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    request_body = ProductInput,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn update_product(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, ROUTE).await?;
    let id = parse_id(&id)?;
    let fields = input.validate()?;
    let query = concat!(
        r"UPDATE products SET
            name_en = $2, name_ar = $3, name_ku = $4,
            description_en = $5, description_ar = $6, description_ku = $7,
            category = $8, price = $9, image_url = $10, is_active = $11
        WHERE id = $1
        RETURNING ",
        product_columns!()
    );
    let row = sqlx::query(query)
        .bind(id)
        .bind(&fields.name_en)
        .bind(&fields.name_ar)
        .bind(&fields.name_ku)
        .bind(&fields.description_en)
        .bind(&fields.description_ar)
        .bind(&fields.description_ku)
        .bind(&fields.category)
        .bind(fields.price)
        .bind(&fields.image_url)
        .bind(fields.is_active)
        .fetch_optional(&*pool)
        .instrument(db_span("UPDATE", query))
        .await
        .context("failed to update product")?;
    let product = row.as_ref().map(product_from_row).ok_or(ServiceError::NotFound)?;
    Ok((StatusCode::OK, Json(product)))
}

#[utoipa::path(
    delete,
    path = "/v1/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn delete_product(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, ROUTE).await?;
    let id = parse_id(&id)?;
    let query = "DELETE FROM products WHERE id = $1";
    let result = sqlx::query(query)
        .bind(id)
        .execute(&*pool)
        .instrument(db_span("DELETE", query))
        .await
        .context("failed to delete product")?;
    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }
    info!(product_id = %id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}
