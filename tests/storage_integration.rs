//! Storage and HTTP checks against a real Postgres.
//!
//! Ignored by default. Run them with
//! `HIWA_TEST_DSN=postgres://... cargo test -- --ignored`; the schema is
//! applied on every run and rows are namespaced per test run.

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        Request, StatusCode,
    },
    Router,
};
use hiwa::{
    api::{
        app,
        handlers::{
            auth::AuthConfig,
            content::PgContentSource,
            partners::{delete_partner_row, fetch_partners, insert_partner, PartnerInput},
            uploads::UploadConfig,
        },
        AppState,
    },
    content::{ContentResolver, Language},
};
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../sql/schema.sql");
const NEEDS_DSN: &str = "set HIWA_TEST_DSN to a scratch Postgres database";

async fn test_pool() -> Result<PgPool> {
    let dsn = std::env::var("HIWA_TEST_DSN").map_err(|_| anyhow!(NEEDS_DSN))?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&dsn)
        .await
        .context("failed to connect to HIWA_TEST_DSN")?;
    for statement in split_sql_statements(SCHEMA) {
        sqlx::query(&statement)
            .execute(&pool)
            .await
            .with_context(|| format!("failed to apply: {statement}"))?;
    }
    Ok(pool)
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');
        if trimmed.ends_with(';') {
            statements.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }
    statements
}

#[test]
fn schema_splits_into_statements() {
    let statements = split_sql_statements(SCHEMA);
    assert!(statements.iter().all(|statement| statement.ends_with(';')));
    assert!(statements
        .iter()
        .any(|statement| statement.starts_with("CREATE TABLE IF NOT EXISTS partners")));
}

#[tokio::test]
#[ignore = "needs HIWA_TEST_DSN"]
async fn deleting_a_partner_removes_only_that_row() -> Result<()> {
    let pool = test_pool().await?;
    let run = Uuid::new_v4().simple().to_string();
    let creator = Uuid::new_v4();

    let doomed = PartnerInput {
        name: format!("Doomed {run}"),
        ..PartnerInput::default()
    }
    .validate()?;
    let kept = PartnerInput {
        name: format!("Kept {run}"),
        contact_email: Some("sales@example.com".to_string()),
        ..PartnerInput::default()
    }
    .validate()?;

    let doomed = insert_partner(&pool, &doomed, creator).await?;
    let kept = insert_partner(&pool, &kept, creator).await?;
    assert_eq!(kept.created_by, Some(creator));

    assert!(delete_partner_row(&pool, doomed.id).await?);
    assert!(!delete_partner_row(&pool, doomed.id).await?);

    let remaining = fetch_partners(&pool).await?;
    assert!(remaining.iter().all(|partner| partner.id != doomed.id));
    assert!(remaining.iter().any(|partner| partner.id == kept.id));

    delete_partner_row(&pool, kept.id).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "needs HIWA_TEST_DSN"]
async fn resolver_reads_active_rows_with_english_fallback() -> Result<()> {
    let pool = test_pool().await?;
    let section = format!("it_{}", Uuid::new_v4().simple());

    sqlx::query(
        r"INSERT INTO website_content (section, key, value_en, value_ar, is_active) VALUES
            ($1, 'title', 'Welcome', 'أهلاً', TRUE),
            ($1, 'subtitle', 'Since 2020', NULL, TRUE),
            ($1, 'hidden', 'Secret', 'سري', FALSE)",
    )
    .bind(&section)
    .execute(&pool)
    .await?;

    let source = Arc::new(PgContentSource::new(pool.clone()));
    let resolver = ContentResolver::load(source, Language::Ar).await?;

    assert_eq!(resolver.get_content(&section, "title", "x").await, "أهلاً");
    assert_eq!(
        resolver.get_content(&section, "subtitle", "x").await,
        "Since 2020"
    );
    assert_eq!(
        resolver.get_content(&section, "hidden", "fallback").await,
        "fallback"
    );

    sqlx::query("DELETE FROM website_content WHERE section = $1")
        .bind(&section)
        .execute(&pool)
        .await?;
    Ok(())
}

fn test_app(pool: PgPool) -> Result<Router> {
    let upload_dir = std::env::temp_dir().join("hiwa-integration-uploads");
    let state = AppState::new(
        pool,
        AuthConfig::new("http://localhost:5173".to_string()),
        UploadConfig::new(upload_dir),
    );
    app(state)
}

/// Insert an active admin with a known password; returns the sign-in email.
async fn seed_admin(pool: &PgPool, password: &str) -> Result<String> {
    let email = format!("admin-{}@example.com", Uuid::new_v4().simple());
    let salt = SaltString::encode_b64(&[7u8; 16]).map_err(|err| anyhow!("salt: {err}"))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("hash: {err}"))?
        .to_string();
    let user_id: Uuid =
        sqlx::query_scalar("INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id")
            .bind(&email)
            .bind(hash)
            .fetch_one(pool)
            .await?;
    sqlx::query("INSERT INTO profiles (user_id, email, role) VALUES ($1, $2, 'admin')")
        .bind(user_id)
        .bind(&email)
        .execute(pool)
        .await?;
    Ok(email)
}

/// Sign in over HTTP and return the `Cookie` header value for later requests.
async fn sign_in(app: &Router, email: &str, password: &str) -> Result<String> {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "password": password }).to_string(),
        ))?;
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .context("login did not set a cookie")?;
    let pair = set_cookie.split(';').next().unwrap_or_default();
    Ok(pair.trim().to_string())
}

async fn call(
    app: &Router,
    cookie: &str,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(COOKIE, cookie);
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 256 * 1024).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

#[tokio::test]
#[ignore = "needs HIWA_TEST_DSN"]
async fn blank_brand_name_is_rejected_over_http() -> Result<()> {
    let pool = test_pool().await?;
    let email = seed_admin(&pool, "correct horse").await?;
    let app = test_app(pool.clone())?;
    let cookie = sign_in(&app, &email, "correct horse").await?;

    let before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM brands")
        .fetch_one(&pool)
        .await?;
    let (status, body) =
        call(&app, &cookie, "POST", "/v1/brands", Some(json!({ "name": "  " }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Brand name is required");
    let after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM brands")
        .fetch_one(&pool)
        .await?;
    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
#[ignore = "needs HIWA_TEST_DSN"]
async fn partner_delete_over_http() -> Result<()> {
    let pool = test_pool().await?;
    let email = seed_admin(&pool, "correct horse").await?;
    let app = test_app(pool)?;
    let cookie = sign_in(&app, &email, "correct horse").await?;
    let run = Uuid::new_v4().simple().to_string();

    let (status, doomed) = call(
        &app,
        &cookie,
        "POST",
        "/v1/partners",
        Some(json!({ "name": format!("Doomed {run}") })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, kept) = call(
        &app,
        &cookie,
        "POST",
        "/v1/partners",
        Some(json!({ "name": format!("Kept {run}") })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let doomed_id = doomed["id"].as_str().context("partner id")?;
    let uri = format!("/v1/partners/{doomed_id}");
    let (status, _) = call(&app, &cookie, "DELETE", &uri, None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = call(&app, &cookie, "DELETE", &uri, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");

    let (status, listed) = call(&app, &cookie, "GET", "/v1/partners", None).await?;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = listed
        .as_array()
        .context("partner list")?
        .iter()
        .filter_map(|partner| partner["id"].as_str())
        .collect();
    assert!(!ids.contains(&doomed_id));
    assert!(ids.contains(&kept["id"].as_str().context("partner id")?));

    let kept_uri = format!("/v1/partners/{}", kept["id"].as_str().unwrap_or_default());
    call(&app, &cookie, "DELETE", &kept_uri, None).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "needs HIWA_TEST_DSN"]
async fn duplicate_user_email_is_a_conflict_and_leaves_one_identity() -> Result<()> {
    let pool = test_pool().await?;
    let email = seed_admin(&pool, "correct horse").await?;
    let app = test_app(pool.clone())?;
    let cookie = sign_in(&app, &email, "correct horse").await?;
    let staff = format!("staff-{}@example.com", Uuid::new_v4().simple());
    let payload = json!({ "email": staff, "password": "s3cret", "role": "user" });

    let (status, created) = call(&app, &cookie, "POST", "/v1/users", Some(payload.clone())).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["email"], staff.as_str());

    let (status, body) = call(&app, &cookie, "POST", "/v1/users", Some(payload)).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "A user with this email already exists");

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&staff)
        .fetch_one(&pool)
        .await?;
    let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE email = $1")
        .bind(&staff)
        .fetch_one(&pool)
        .await?;
    assert_eq!((users, profiles), (1, 1));

    // The pool stays usable after the rolled-back insert.
    let (status, _) = call(&app, &cookie, "GET", "/v1/users", None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
