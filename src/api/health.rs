//! Liveness endpoint. No auth, no dependency checks — a 200 means the
//! process is up and accepting connections.

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
