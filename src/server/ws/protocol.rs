use serde::Deserialize;

/// A frame sent by the chat page over `/ws`.
#[derive(Debug, Deserialize, Default)]
pub struct WsIncomingMessage {
    #[serde(rename = "type")]
    pub msg_type: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

pub const SEND_MESSAGE: &str = "send_message";
pub const SET_SESSION: &str = "set_session";
