//! Partner management endpoints. Owners and admins only.

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
    auth::require_route, db_span, normalize_optional, normalize_required, parse_id, valid_email,
    JsonBody, ServiceError,
};
use crate::rbac::routes::Route;

const ROUTE: Route = Route::AdminPartners;

macro_rules! partner_columns {
    () => {
        r#"id, name, description_en, description_ar, description_ku, logo_url, website_url,
           contact_email, contact_phone, is_active, created_by,
           to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
           to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at"#
    };
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Partner {
    pub id: Uuid,
    pub name: String,
    pub description_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_ku: Option<String>,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PartnerInput {
    #[serde(default)]
    pub name: String,
    pub description_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_ku: Option<String>,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct PartnerFields {
    pub name: String,
    pub description_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_ku: Option<String>,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub is_active: bool,
}

impl PartnerInput {
    /// # Errors
    /// Returns `400` when the name is blank or the contact email is malformed.
    pub fn validate(self) -> Result<PartnerFields, ServiceError> {
        let name = normalize_required(&self.name)
            .ok_or_else(|| ServiceError::bad_request("Partner name is required"))?;
        let contact_email = normalize_optional(self.contact_email);
        if contact_email.as_deref().is_some_and(|email| !valid_email(email)) {
            return Err(ServiceError::bad_request("Invalid email address"));
        }
        Ok(PartnerFields {
            name,
            description_en: normalize_optional(self.description_en),
            description_ar: normalize_optional(self.description_ar),
            description_ku: normalize_optional(self.description_ku),
            logo_url: normalize_optional(self.logo_url),
            website_url: normalize_optional(self.website_url),
            contact_email,
            contact_phone: normalize_optional(self.contact_phone),
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

fn partner_from_row(row: &PgRow) -> Partner {
    Partner {
        id: row.get("id"),
        name: row.get("name"),
        description_en: row.get("description_en"),
        description_ar: row.get("description_ar"),
        description_ku: row.get("description_ku"),
        logo_url: row.get("logo_url"),
        website_url: row.get("website_url"),
        contact_email: row.get("contact_email"),
        contact_phone: row.get("contact_phone"),
        is_active: row.get("is_active"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[utoipa::path(
    get,
    path = "/v1/partners",
    responses(
        (status = 200, description = "All partners, newest first", body = [Partner]),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
    ),
    tag = "partners"
)]
pub async fn list_partners(
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, ROUTE).await?;
    let partners = fetch_partners(&pool).await?;
    Ok((StatusCode::OK, Json(partners)))
}

#[utoipa::path(
    post,
    path = "/v1/partners",
    request_body = PartnerInput,
    responses(
        (status = 201, description = "Partner created", body = Partner),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
    ),
    tag = "partners"
)]
pub async fn create_partner(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    JsonBody(input): JsonBody<PartnerInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let principal = require_route(&headers, &pool, ROUTE).await?;
    let fields = input.validate()?;
    let partner = insert_partner(&pool, &fields, principal.user_id).await?;
    info!(partner_id = %partner.id, "partner created");
    Ok((StatusCode::CREATED, Json(partner)))
}

#[utoipa::path(
    put,
    path = "/v1/partners/{id}",
    params(("id" = String, Path, description = "Partner id")),
    request_body = PartnerInput,
    responses(
        (status = 200, description = "Partner updated", body = Partner),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
        (status = 404, description = "Partner not found"),
    ),
    tag = "partners"
)]
pub async fn update_partner(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    JsonBody(input): JsonBody<PartnerInput>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, ROUTE).await?;
    let id = parse_id(&id)?;
    let fields = input.validate()?;
    let partner = update_partner_row(&pool, id, &fields)
        .await?
        .ok_or(ServiceError::NotFound)?;
    Ok((StatusCode::OK, Json(partner)))
}

#[utoipa::path(
    delete,
    path = "/v1/partners/{id}",
    params(("id" = String, Path, description = "Partner id")),
    responses(
        (status = 204, description = "Partner deleted"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
        (status = 404, description = "Partner not found"),
    ),
    tag = "partners"
)]
pub async fn delete_partner(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, ROUTE).await?;
    let id = parse_id(&id)?;
    if !delete_partner_row(&pool, id).await? {
        return Err(ServiceError::NotFound);
    }
    info!(partner_id = %id, "partner deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn fetch_partners(pool: &PgPool) -> anyhow::Result<Vec<Partner>> {
    let query = concat!("SELECT ", partner_columns!(), " FROM partners ORDER BY created_at DESC");
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to list partners")?;
    Ok(rows.iter().map(partner_from_row).collect())
}

pub async fn insert_partner(
    pool: &PgPool,
    fields: &PartnerFields,
    created_by: Uuid,
) -> anyhow::Result<Partner> {
    let query = concat!(
        r"INSERT INTO partners
            (name, description_en, description_ar, description_ku, logo_url, website_url,
             contact_email, contact_phone, is_active, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING ",
        partner_columns!()
    );
    let row = sqlx::query(query)
        .bind(&fields.name)
        .bind(&fields.description_en)
        .bind(&fields.description_ar)
        .bind(&fields.description_ku)
        .bind(&fields.logo_url)
        .bind(&fields.website_url)
        .bind(&fields.contact_email)
        .bind(&fields.contact_phone)
        .bind(fields.is_active)
        .bind(created_by)
        .fetch_one(pool)
        .instrument(db_span("INSERT", query))
        .await
        .context("failed to insert partner")?;
    Ok(partner_from_row(&row))
}

async fn update_partner_row(
    pool: &PgPool,
    id: Uuid,
    fields: &PartnerFields,
) -> anyhow::Result<Option<Partner>> {
    let query = concat!(
        r"UPDATE partners SET
            name = $2, description_en = $3, description_ar = $4, description_ku = $5,
            logo_url = $6, website_url = $7, contact_email = $8, contact_phone = $9,
            is_active = $10
        WHERE id = $1
        RETURNING ",
        partner_columns!()
    );
    let row = sqlx::query(query)
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.description_en)
        .bind(&fields.description_ar)
        .bind(&fields.description_ku)
        .bind(&fields.logo_url)
        .bind(&fields.website_url)
        .bind(&fields.contact_email)
        .bind(&fields.contact_phone)
        .bind(fields.is_active)
        .fetch_optional(pool)
        .instrument(db_span("UPDATE", query))
        .await
        .context("failed to update partner")?;
    Ok(row.as_ref().map(partner_from_row))
}

/// `false` when no row had this id.
pub async fn delete_partner_row(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let query = "DELETE FROM partners WHERE id = $1";
    let result = sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(db_span("DELETE", query))
        .await
        .context("failed to delete partner")?;
    Ok(result.rows_affected() > 0)
}
