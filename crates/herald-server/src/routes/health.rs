//! Liveness and diagnostics endpoints.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

const SERVICE_NAME: &str = "Herald Twitter API";

/// `GET /`
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": format!("{} is running", SERVICE_NAME),
        "status": "healthy"
    }))
}

/// `GET /health`
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

/// `GET /test`: reachability plus whether OAuth is configured
pub async fn test_endpoint(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "API is accessible",
        "environment_set": state.client_id_configured,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
