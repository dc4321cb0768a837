use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::history::{HistoryStore, Message};
use crate::state::AppState;

pub async fn create_session(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    let session_id = Uuid::new_v4().to_string();
    Json(json!({ "session_id": session_id }))
}

pub async fn get_session_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.history.query_ordered(&session_id).await?;
    let formatted: Vec<Value> = messages.iter().map(format_message).collect();
    Ok(Json(json!({ "messages": formatted })))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.window.clear_session(&session_id).await?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

pub fn format_message(message: &Message) -> Value {
    json!({
        "role": message.role.completion_role(),
        "content": message.text,
        "timestamp": message.timestamp,
    })
}
