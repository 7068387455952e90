pub mod health;
pub mod tasks;

use std::sync::Arc;

use axum::{http::StatusCode, middleware, Json, Router};
use serde_json::{json, Value};
use taskmanager_db::Database;
use taskmanager_service::LocalService;
use tower_http::cors::CorsLayer;

use crate::metrics::{track_metrics, MetricsRegistry};

pub struct InnerAppState {
    pub service: LocalService,
    pub metrics: Arc<MetricsRegistry>,
}

pub type AppState = Arc<InnerAppState>;

pub fn new_state(db: Arc<dyn Database>) -> AppState {
    Arc::new(InnerAppState {
        service: LocalService::new(db),
        metrics: Arc::new(MetricsRegistry::new()),
    })
}

/// Every route, the JSON 404 fallback, CORS, and the instrumentation layer
/// wrapped outermost so it sees all responses.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(tasks::routes())
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn_with_state(state.clone(), track_metrics))
        .with_state(state)
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}
