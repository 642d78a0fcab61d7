use axum::response::Json;
use serde_json::{json, Value};

/// GET /health - Liveness check; does not touch Firebase
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now(),
    }))
}
