use axum::{response::IntoResponse, Json};
use serde_json::json;

// Undocumented landing route.
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/docs",
    }))
}
