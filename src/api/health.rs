use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check handler.
/// Returns JSON with status and a config summary; never exposes the API key.
pub fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let agent = &state.config.agent;
    let backend = state.backend_url();
    Json(json!({
        "status": "agui-relay is running",
        "config": {
            "backend_host": backend.host_str().unwrap_or_default(),
            "backend_port": backend.port_or_known_default(),
            "default_model": agent.default_model,
            "workflow_type": agent.workflow_type,
            "idle_read_timeout_secs": agent.idle_read_timeout_secs,
            "log_level": state.config.features.log_level,
        }
    }))
}
