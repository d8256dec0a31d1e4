//! HTTP endpoint exposing stored assets to the emoji registry.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::store::AssetStore;

/// Build the asset router: `GET /images/{name}` and `GET /health`.
pub fn asset_routes(store: Arc<AssetStore>) -> Router {
    Router::new()
        .route("/images/{name}", get(serve_asset))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "emoji-bot-assets"
    }))
}

async fn serve_asset(Path(name): Path<String>, State(store): State<Arc<AssetStore>>) -> Response {
    let Some(path) = store.path_for(&name) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(name = %name, error = %e, "Failed to read asset");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
