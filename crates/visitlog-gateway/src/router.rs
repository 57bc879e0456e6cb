use axum::Json;
use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::state::SharedState;

/// Build the main application router with all routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/visit", post(api::create_visit))
        .route("/cleanup", delete(api::cleanup_visits))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn status() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "alive": true }))
}
