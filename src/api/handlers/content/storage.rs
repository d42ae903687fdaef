//! `website_content` queries and the database-backed content source.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::ContentFields;
use crate::api::handlers::db_span;
use crate::content::{ContentItem, ContentSource};

macro_rules! content_columns {
    () => {
        r#"id, section, key, content_type, value_en, value_ar, value_ku, is_active,
           to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at"#
    };
}

fn item_from_row(row: &PgRow) -> ContentItem {
    ContentItem {
        id: row.get("id"),
        section: row.get("section"),
        key: row.get("key"),
        content_type: row.get("content_type"),
        value_en: row.get("value_en"),
        value_ar: row.get("value_ar"),
        value_ku: row.get("value_ku"),
        is_active: row.get("is_active"),
        updated_at: row.get("updated_at"),
    }
}

/// Reads active entries straight from Postgres.
pub struct PgContentSource {
    pool: PgPool,
}

impl PgContentSource {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentSource for PgContentSource {
    async fn active_items(&self) -> Result<Vec<ContentItem>> {
        // created_at breaks ties so the newest duplicate wins in the map.
        let query = concat!(
            "SELECT ",
            content_columns!(),
            " FROM website_content WHERE is_active ORDER BY section, key, created_at"
        );
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to load active content")?;
        Ok(rows.iter().map(item_from_row).collect())
    }
}

/// Every entry, active or not, for the admin listing.
pub(super) async fn list_items(pool: &PgPool) -> Result<Vec<ContentItem>> {
    let query = concat!(
        "SELECT ",
        content_columns!(),
        " FROM website_content ORDER BY section, key"
    );
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to list content")?;
    Ok(rows.iter().map(item_from_row).collect())
}

pub(super) async fn insert_item(
    pool: &PgPool,
    fields: &ContentFields,
    updated_by: Uuid,
) -> Result<ContentItem> {
    let query = concat!(
        r"INSERT INTO website_content
            (section, key, content_type, value_en, value_ar, value_ku, is_active, updated_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING ",
        content_columns!()
    );
    let row = sqlx::query(query)
        .bind(&fields.section)
        .bind(&fields.key)
        .bind(&fields.content_type)
        .bind(&fields.value_en)
        .bind(&fields.value_ar)
        .bind(&fields.value_ku)
        .bind(fields.is_active)
        .bind(updated_by)
        .fetch_one(pool)
        .instrument(db_span("INSERT", query))
        .await
        .context("failed to insert content")?;
    Ok(item_from_row(&row))
}

pub(super) async fn update_item(
    pool: &PgPool,
    id: Uuid,
    fields: &ContentFields,
    updated_by: Uuid,
) -> Result<Option<ContentItem>> {
    let query = concat!(
        r"UPDATE website_content SET
            section = $2, key = $3, content_type = $4,
            value_en = $5, value_ar = $6, value_ku = $7,
            is_active = $8, updated_by = $9
        WHERE id = $1
        RETURNING ",
        content_columns!()
    );
    let row = sqlx::query(query)
        .bind(id)
        .bind(&fields.section)
        .bind(&fields.key)
        .bind(&fields.content_type)
        .bind(&fields.value_en)
        .bind(&fields.value_ar)
        .bind(&fields.value_ku)
        .bind(fields.is_active)
        .bind(updated_by)
        .fetch_optional(pool)
        .instrument(db_span("UPDATE", query))
        .await
        .context("failed to update content")?;
    Ok(row.as_ref().map(item_from_row))
}

pub(super) async fn delete_item(pool: &PgPool, id: Uuid) -> Result<bool> {
    let query = "DELETE FROM website_content WHERE id = $1";
    let result = sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(db_span("DELETE", query))
        .await
        .context("failed to delete content")?;
    Ok(result.rows_affected() > 0)
}
