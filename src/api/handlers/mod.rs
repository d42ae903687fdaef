//! API handlers and shared helpers.
//!
//! Every protected handler follows the same flow: resolve the session, run the
//! shared guard for the route, validate and normalize the payload, then talk to
//! the database. Validation never touches the database.

pub mod auth;
pub mod brands;
pub mod content;
pub mod dashboard;
pub mod health;
pub mod pages;
pub mod partners;
pub mod products;
pub mod root;
pub mod settings;
pub mod uploads;
pub mod users;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tracing::{error, info_span, Span};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::content::Language;

/// Handler-level failures mapped onto HTTP responses.
///
/// 4xx bodies are `{"error": "<message>"}`; backend failures are logged and
/// surfaced as a generic `500`.
#[derive(Debug)]
pub enum ServiceError {
    BadRequest(String),
    Unauthorized,
    InvalidCredentials,
    Forbidden,
    NotFound,
    Conflict(String),
    PayloadTooLarge(String),
    UnsupportedMediaType(String),
    Internal(anyhow::Error),
}

impl ServiceError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::BadRequest(message)
            | Self::Conflict(message)
            | Self::PayloadTooLarge(message)
            | Self::UnsupportedMediaType(message) => message,
            Self::Unauthorized => "Authentication required",
            Self::InvalidCredentials => "Invalid email or password",
            Self::Forbidden => "Access denied",
            Self::NotFound => "Not found",
            Self::Internal(_) => "Internal server error",
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Internal(err) => write!(f, "internal error: {err:#}"),
            other => f.write_str(other.message()),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Internal(err) => Some(&**err),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("Request failed: {err:#}");
        }
        let status = self.status();
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                Self::UnsupportedMediaType(rejection.body_text())
            }
            other => Self::BadRequest(other.body_text()),
        }
    }
}

/// `Json` extractor whose rejections use the `{"error": ...}` body.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `?lang=` query shared by the public endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LanguageQuery {
    /// `en`, `ar` or `ku` (case-insensitive). Defaults to `en`.
    pub lang: Option<String>,
}

impl LanguageQuery {
    /// # Errors
    /// Returns `400` for an unsupported language code.
    pub fn language(&self) -> Result<Language, ServiceError> {
        match self.lang.as_deref().map(str::trim) {
            None | Some("") => Ok(Language::default()),
            Some(code) => code
                .parse()
                .map_err(|_| ServiceError::bad_request(format!("Unsupported language: {code}"))),
        }
    }
}

/// Trim a required field; `None` when it is empty after trimming.
pub(crate) fn normalize_required(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Empty optional strings are stored as `NULL`.
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|value| normalize_required(&value))
}

pub(crate) fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

pub(crate) fn parse_id(id: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(id.trim()).map_err(|_| ServiceError::bad_request("Invalid id"))
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

pub(crate) fn db_span(operation: &'static str, statement: &'static str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[test]
    fn normalize_required_trims() {
        assert_eq!(normalize_required("  Castrol "), Some("Castrol".to_string()));
        assert_eq!(normalize_required("   "), None);
    }

    #[test]
    fn normalize_optional_nulls_empty_strings() {
        assert_eq!(normalize_optional(Some(String::new())), None);
        assert_eq!(normalize_optional(Some("  ".to_string())), None);
        assert_eq!(normalize_optional(None), None);
        assert_eq!(
            normalize_optional(Some(" https://castrol.com ".to_string())),
            Some("https://castrol.com".to_string())
        );
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("info@hiwajamil.com"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn parse_id_rejects_garbage() {
        assert!(parse_id("not-a-uuid").is_err());
        assert!(parse_id(&Uuid::new_v4().to_string()).is_ok());
    }

    #[test]
    fn language_query_defaults_to_english() -> Result<(), ServiceError> {
        assert_eq!(LanguageQuery::default().language()?, Language::En);
        let query = LanguageQuery {
            lang: Some("AR".to_string()),
        };
        assert_eq!(query.language()?, Language::Ar);
        Ok(())
    }

    #[test]
    fn language_query_rejects_unknown_codes() {
        let query = LanguageQuery {
            lang: Some("fr".to_string()),
        };
        assert!(matches!(query.language(), Err(ServiceError::BadRequest(_))));
    }

    #[test]
    fn service_error_status_codes() {
        assert_eq!(ServiceError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ServiceError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ServiceError::PayloadTooLarge(String::new()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ServiceError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn service_error_body_carries_message() -> anyhow::Result<()> {
        let response = ServiceError::bad_request("Brand name is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(body["error"], "Brand name is required");
        Ok(())
    }

    #[tokio::test]
    async fn internal_error_body_is_generic() -> anyhow::Result<()> {
        let response =
            ServiceError::Internal(anyhow::anyhow!("connection refused")).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(body["error"], "Internal server error");
        Ok(())
    }

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    fn json_request(content_type: Option<&str>, body: &'static str) -> anyhow::Result<Request> {
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(axum::http::header::CONTENT_TYPE, content_type);
        }
        Ok(builder.body(axum::body::Body::from(body))?)
    }

    #[tokio::test]
    async fn json_body_accepts_valid_payloads() -> anyhow::Result<()> {
        let request = json_request(Some("application/json"), r#"{"name":"Castrol"}"#)?;
        let JsonBody(named) = JsonBody::<Named>::from_request(request, &())
            .await
            .map_err(|err| anyhow::anyhow!("{err}"))?;
        assert_eq!(named.name, "Castrol");
        Ok(())
    }

    #[tokio::test]
    async fn json_body_rejections_are_service_errors() -> anyhow::Result<()> {
        let request = json_request(Some("application/json"), r#"{"name":"#)?;
        let result = JsonBody::<Named>::from_request(request, &()).await;
        assert!(matches!(result, Err(ServiceError::BadRequest(_))));

        let request = json_request(Some("application/json"), r#"{"name":7}"#)?;
        let result = JsonBody::<Named>::from_request(request, &()).await;
        assert!(matches!(result, Err(ServiceError::BadRequest(_))));

        let request = json_request(None, r#"{"name":"Castrol"}"#)?;
        let result = JsonBody::<Named>::from_request(request, &()).await;
        assert!(matches!(result, Err(ServiceError::UnsupportedMediaType(_))));
        Ok(())
    }

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23503"),
        }));
        assert!(!is_unique_violation(&err));

        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
