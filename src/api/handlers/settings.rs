//! Site-wide settings, a single row. Admin only.

use anyhow::Context;
use axum::{
    extract::Extension,
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
    auth::require_route, db_span, normalize_required, valid_email, JsonBody, ServiceError,
};
use crate::rbac::routes::Route;

const ROUTE: Route = Route::AdminSettings;

macro_rules! settings_columns {
    () => {
        r#"site_name, site_description, contact_email, contact_phone, address,
           maintenance_mode, registration_enabled, email_notifications, backup_enabled,
           auto_backup_interval_hours, updated_by,
           to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at"#
    };
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SiteSettings {
    pub site_name: String,
    pub site_description: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub address: String,
    pub maintenance_mode: bool,
    pub registration_enabled: bool,
    pub email_notifications: bool,
    pub backup_enabled: bool,
    pub auto_backup_interval_hours: i32,
    pub updated_by: Option<Uuid>,
    pub updated_at: String,
}

/// Omitted fields keep their stored value.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SettingsInput {
    pub site_name: Option<String>,
    pub site_description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub maintenance_mode: Option<bool>,
    pub registration_enabled: Option<bool>,
    pub email_notifications: Option<bool>,
    pub backup_enabled: Option<bool>,
    pub auto_backup_interval_hours: Option<i32>,
}

impl SettingsInput {
    /// Trim provided text fields and check them.
    ///
    /// # Errors
    /// Returns `400` for a blank site name, a malformed contact email or a
    /// backup interval below one hour.
    pub fn validate(mut self) -> Result<Self, ServiceError> {
        if let Some(name) = self.site_name.take() {
            self.site_name = Some(
                normalize_required(&name)
                    .ok_or_else(|| ServiceError::bad_request("Site name is required"))?,
            );
        }
        if let Some(email) = self.contact_email.take() {
            let email = email.trim().to_string();
            if !valid_email(&email) {
                return Err(ServiceError::bad_request("Invalid email address"));
            }
            self.contact_email = Some(email);
        }
        if self.auto_backup_interval_hours.is_some_and(|hours| hours < 1) {
            return Err(ServiceError::bad_request(
                "Backup interval must be at least one hour",
            ));
        }
        self.site_description = self.site_description.map(|value| value.trim().to_string());
        self.contact_phone = self.contact_phone.map(|value| value.trim().to_string());
        self.address = self.address.map(|value| value.trim().to_string());
        Ok(self)
    }
}

fn settings_from_row(row: &PgRow) -> SiteSettings {
    SiteSettings {
        site_name: row.get("site_name"),
        site_description: row.get("site_description"),
        contact_email: row.get("contact_email"),
        contact_phone: row.get("contact_phone"),
        address: row.get("address"),
        maintenance_mode: row.get("maintenance_mode"),
        registration_enabled: row.get("registration_enabled"),
        email_notifications: row.get("email_notifications"),
        backup_enabled: row.get("backup_enabled"),
        auto_backup_interval_hours: row.get("auto_backup_interval_hours"),
        updated_by: row.get("updated_by"),
        updated_at: row.get("updated_at"),
    }
}

#[utoipa::path(
    get,
    path = "/v1/settings",
    responses(
        (status = 200, description = "Current settings", body = SiteSettings),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
    ),
    tag = "admin"
)]
pub async fn get_settings(
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ServiceError> {
    require_route(&headers, &pool, ROUTE).await?;
    let query = concat!("SELECT ", settings_columns!(), " FROM site_settings WHERE id = 1");
    let row = sqlx::query(query)
        .fetch_optional(&*pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to load settings")?
        .ok_or(ServiceError::NotFound)?;
    Ok((StatusCode::OK, Json(settings_from_row(&row))))
}

#[utoipa::path(
    put,
    path = "/v1/settings",
    request_body = SettingsInput,
    responses(
        (status = 200, description = "Settings saved", body = SiteSettings),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid session"),
        (status = 403, description = "Role not permitted"),
    ),
    tag = "admin"
)]
pub async fn update_settings(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    JsonBody(input): JsonBody<SettingsInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let principal = require_route(&headers, &pool, ROUTE).await?;
    let input = input.validate()?;

    // Recreate the singleton row if it is missing.
    let query = "INSERT INTO site_settings (id) VALUES (1) ON CONFLICT (id) DO NOTHING";
    sqlx::query(query)
        .execute(&*pool)
        .instrument(db_span("INSERT", query))
        .await
        .context("failed to seed settings")?;

    let query = concat!(
        r"UPDATE site_settings SET
            site_name = COALESCE($1, site_name),
            site_description = COALESCE($2, site_description),
            contact_email = COALESCE($3, contact_email),
            contact_phone = COALESCE($4, contact_phone),
            address = COALESCE($5, address),
            maintenance_mode = COALESCE($6, maintenance_mode),
            registration_enabled = COALESCE($7, registration_enabled),
            email_notifications = COALESCE($8, email_notifications),
            backup_enabled = COALESCE($9, backup_enabled),
            auto_backup_interval_hours = COALESCE($10, auto_backup_interval_hours),
            updated_by = $11
        WHERE id = 1
        RETURNING ",
        settings_columns!()
    );
    let row = sqlx::query(query)
        .bind(&input.site_name)
        .bind(&input.site_description)
        .bind(&input.contact_email)
        .bind(&input.contact_phone)
        .bind(&input.address)
        .bind(input.maintenance_mode)
        .bind(input.registration_enabled)
        .bind(input.email_notifications)
        .bind(input.backup_enabled)
        .bind(input.auto_backup_interval_hours)
        .bind(principal.user_id)
        .fetch_one(&*pool)
        .instrument(db_span("UPDATE", query))
        .await
        .context("failed to update settings")?;
    info!("site settings updated");
    Ok((StatusCode::OK, Json(settings_from_row(&row))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<SettingsInput, ServiceError>) -> String {
        match result {
            Err(ServiceError::BadRequest(message)) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn blank_site_name_is_rejected() {
        let input = SettingsInput {
            site_name: Some("  ".to_string()),
            ..SettingsInput::default()
        };
        assert_eq!(message(input.validate()), "Site name is required");
    }

    #[test]
    fn contact_email_must_be_valid() {
        let input = SettingsInput {
            contact_email: Some("info-at-hijamil".to_string()),
            ..SettingsInput::default()
        };
        assert_eq!(message(input.validate()), "Invalid email address");
    }

    #[test]
    fn backup_interval_must_be_positive() {
        let input = SettingsInput {
            auto_backup_interval_hours: Some(0),
            ..SettingsInput::default()
        };
        assert!(matches!(input.validate(), Err(ServiceError::BadRequest(_))));
    }

    #[test]
    fn omitted_fields_stay_none() -> Result<(), ServiceError> {
        let input = SettingsInput {
            site_name: Some(" Hiwa Jamil Oil Services ".to_string()),
            maintenance_mode: Some(true),
            ..SettingsInput::default()
        }
        .validate()?;
        assert_eq!(input.site_name.as_deref(), Some("Hiwa Jamil Oil Services"));
        assert_eq!(input.maintenance_mode, Some(true));
        assert_eq!(input.contact_email, None);
        assert_eq!(input.auto_backup_interval_hours, None);
        Ok(())
    }
}
