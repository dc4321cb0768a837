use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: String,
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let session_id = payload
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let reply = state
        .window
        .handle_turn(&session_id, &payload.message)
        .await?;

    Ok(Json(json!({ "session_id": session_id, "reply": reply })))
}
