use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use uuid::Uuid;

use super::protocol::{WsIncomingMessage, SEND_MESSAGE, SET_SESSION};
use crate::core::errors::ApiError;
use crate::history::HistoryStore;
use crate::server::handlers::sessions::format_message;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let origin_ok = validate_origin(&headers, &state.config.server.allowed_origins);
    ws.on_upgrade(move |socket| handle_socket(socket, state, origin_ok))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, origin_ok: bool) {
    let (mut sender, mut receiver) = socket.split();

    if !origin_ok {
        let _ = sender
            .send(Message::Close(Some(CloseFrame {
                code: 4003,
                reason: "Forbidden: Invalid Origin".into(),
            })))
            .await;
        return;
    }

    let mut current_session_id = Uuid::new_v4().to_string();
    tracing::debug!(session_id = %current_session_id, "WebSocket connected");
    if send_json(
        &mut sender,
        json!({"type": "session", "sessionId": current_session_id}),
    )
    .await
    .is_err()
    {
        return;
    }

    while let Some(Ok(msg)) = receiver.next().await {
        let incoming = match msg {
            Message::Text(text) => match serde_json::from_str::<WsIncomingMessage>(&text) {
                Ok(incoming) => incoming,
                Err(err) => {
                    let _ = send_error(&mut sender, &format!("Malformed frame: {}", err)).await;
                    continue;
                }
            },
            Message::Close(_) => break,
            _ => continue,
        };

        if let Err(err) =
            handle_message(&mut sender, &state, &mut current_session_id, incoming).await
        {
            if send_error(&mut sender, err.message()).await.is_err() {
                break;
            }
        }
    }

    tracing::debug!(session_id = %current_session_id, "WebSocket closed");
}

async fn handle_message(
    sender: &mut SplitSink<WebSocket, Message>,
    state: &Arc<AppState>,
    current_session_id: &mut String,
    data: WsIncomingMessage,
) -> Result<(), ApiError> {
    match data.msg_type.as_deref().unwrap_or(SEND_MESSAGE) {
        SET_SESSION => {
            *current_session_id = requested_session(data.session_id)?;
            send_json(
                sender,
                json!({"type": "session_changed", "sessionId": current_session_id}),
            )
            .await?;
            send_history(sender, state, current_session_id).await
        }
        SEND_MESSAGE => {
            let message_text = data.message.unwrap_or_default();
            let reply = state
                .window
                .handle_turn(current_session_id, &message_text)
                .await?;
            send_json(sender, json!({"type": "receive_message", "message": reply})).await
        }
        other => Err(ApiError::BadRequest(format!(
            "Unknown message type: {}",
            other
        ))),
    }
}

fn requested_session(session_id: Option<String>) -> Result<String, ApiError> {
    session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("sessionId is required".to_string()))
}

async fn send_history(
    sender: &mut SplitSink<WebSocket, Message>,
    state: &Arc<AppState>,
    session_id: &str,
) -> Result<(), ApiError> {
    let messages = state.history.query_ordered(session_id).await?;
    let formatted: Vec<Value> = messages.iter().map(format_message).collect();
    send_json(sender, json!({"type": "history", "messages": formatted})).await
}

async fn send_error(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &str,
) -> Result<(), ApiError> {
    send_json(sender, json!({"type": "error", "error": message})).await
}

pub async fn send_json(
    sender: &mut SplitSink<WebSocket, Message>,
    payload: Value,
) -> Result<(), ApiError> {
    let text = serde_json::to_string(&payload).map_err(ApiError::internal)?;
    sender
        .send(Message::Text(text))
        .await
        .map_err(ApiError::internal)?;
    Ok(())
}

/// Browsers always send `Origin`; non-browser clients may omit it and are let
/// through. An empty allow-list accepts every origin.
pub(crate) fn validate_origin(headers: &HeaderMap, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let Some(origin) = headers.get("origin").and_then(|v| v.to_str().ok()) else {
        return true;
    };

    allowed.iter().any(|allowed_origin| {
        origin == allowed_origin || origin.starts_with(&format!("{}/", allowed_origin))
    })
}
