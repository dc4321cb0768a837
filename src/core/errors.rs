use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad gateway: {0}")]
    BadGateway(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    /// The text shown to clients, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::BadGateway(msg)
            | ApiError::Internal(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.message() }));
        (status, body).into_response()
    }
}

/// Failure of a single chat-completion round trip.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(String),
    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),
    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed completion response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt history row: {0}")]
    Corrupt(String),
    #[error("cannot create history directory {path}: {source}")]
    Directory {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-turn failures surfaced to the transport.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    History(#[from] HistoryError),
}

impl From<HistoryError> for ApiError {
    fn from(err: HistoryError) -> Self {
        ApiError::internal(err)
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::InvalidInput(msg) => ApiError::BadRequest(msg),
            ChatError::Completion(err) => ApiError::BadGateway(err.to_string()),
            ChatError::History(err) => ApiError::internal(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_errors_map_to_http_statuses() {
        let invalid: ApiError = ChatError::InvalidInput("empty message".into()).into();
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let upstream: ApiError = ChatError::Completion(CompletionError::Status {
            status: 429,
            body: "rate limited".into(),
        })
        .into();
        assert_eq!(upstream.into_response().status(), StatusCode::BAD_GATEWAY);

        let store: ApiError =
            ChatError::History(HistoryError::Corrupt("role 'x'".into())).into();
        assert_eq!(
            store.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
