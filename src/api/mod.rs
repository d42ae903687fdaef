use crate::{
    api::handlers::{
        auth::{self, bootstrap},
        content::PgContentSource,
        health, root,
        uploads::{UploadConfig, UploadStore},
    },
    cli::commands::auth::BootstrapAdmin,
    content::ContentCatalog,
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, options},
    Extension, Router,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    services::ServeDir,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Shared state injected into every handler as `Extension` layers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub auth: Arc<auth::AuthState>,
    pub catalog: Arc<ContentCatalog>,
    pub uploads: Arc<UploadStore>,
}

impl AppState {
    /// State backed by Postgres content for `pool`.
    #[must_use]
    pub fn new(pool: PgPool, auth_config: auth::AuthConfig, upload_config: UploadConfig) -> Self {
        let catalog = ContentCatalog::new(Arc::new(PgContentSource::new(pool.clone())));
        Self {
            pool,
            auth: Arc::new(auth::AuthState::new(auth_config)),
            catalog: Arc::new(catalog),
            uploads: Arc::new(UploadStore::new(upload_config)),
        }
    }
}

/// Assemble the full application: documented routes, docs UI, uploaded files
/// and the middleware stack.
///
/// # Errors
/// Returns an error if the frontend base URL is not a valid origin.
pub fn app(state: AppState) -> Result<Router> {
    let frontend_origin = frontend_origin(state.auth.config().frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let max_body = state.uploads.config().max_bytes();
    let upload_dir = state.uploads.config().dir().clone();

    // `/`, `OPTIONS /health` and the static file service stay out of the OpenAPI document.
    let (router, api_doc) = router().split_for_parts();
    let app = router
        .route("/", get(root::root))
        .route("/health", options(health::health))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", api_doc))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(DefaultBodyLimit::max(max_body))
                .layer(Extension(state.auth))
                .layer(Extension(state.catalog))
                .layer(Extension(state.uploads))
                .layer(Extension(state.pool)),
        );

    Ok(app)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    auth_config: auth::AuthConfig,
    upload_config: UploadConfig,
    bootstrap_admin: Option<BootstrapAdmin>,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    if let Some(admin) = bootstrap_admin.as_ref() {
        bootstrap::ensure_admin(&pool, admin)
            .await
            .context("Failed to bootstrap admin account")?;
    }

    let state = AppState::new(pool, auth_config, upload_config);
    state.uploads.prepare().await?;

    // Warm the default language; later languages load on first request.
    if let Err(err) = state.catalog.try_map(crate::content::Language::default()).await {
        error!("Failed to preload website content: {err:#}");
    }

    let app = app(state)?;

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_origin_strips_path() -> Result<()> {
        let origin = frontend_origin("https://hiwajamil.com/admin/")?;
        assert_eq!(origin, "https://hiwajamil.com");
        Ok(())
    }

    #[test]
    fn frontend_origin_keeps_port() -> Result<()> {
        let origin = frontend_origin("http://localhost:5173")?;
        assert_eq!(origin, "http://localhost:5173");
        Ok(())
    }

    #[test]
    fn frontend_origin_rejects_invalid_url() {
        assert!(frontend_origin("not a url").is_err());
        assert!(frontend_origin("data:text/plain,hello").is_err());
    }
}
