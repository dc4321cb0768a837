use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::llm::LlmProvider;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let reachable = state.llm.health_check().await;
    let settings = state.window.settings();
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0);

    Json(json!({
        "status": "ok",
        "provider": state.llm.name(),
        "provider_reachable": reachable,
        "model": settings.model,
        "summarization_threshold": settings.summarization_threshold,
        "recent_keep": settings.recent_keep,
        "uptime_secs": uptime_secs,
    }))
}
