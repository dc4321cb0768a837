use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, health, page, sessions};
use crate::server::ws::handler::ws_handler;
use crate::state::AppState;

/// Creates the application router: chat page, REST API and `/ws`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.allowed_origins);
    Router::new()
        .route("/", get(page::index))
        .route("/health", get(health::health))
        .route("/api/status", get(health::get_status))
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/:session_id",
            delete(sessions::delete_session),
        )
        .route(
            "/api/sessions/:session_id/messages",
            get(sessions::get_session_messages),
        )
        .route("/api/chat", post(chat::send_message))
        .route("/ws", get(ws_handler))
        .fallback(page::not_found)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::context::testing::ScriptedProvider;
    use crate::core::config::{AppConfig, LlmConfig};
    use crate::history::{HistoryStore, MonotonicClock, SqliteHistoryStore};

    async fn test_state(provider: ScriptedProvider) -> Arc<AppState> {
        let db_path = std::env::temp_dir().join(format!("chat-relay-router-{}.db", Uuid::new_v4()));
        let store = SqliteHistoryStore::new(db_path).await.unwrap();
        let config = AppConfig {
            llm: LlmConfig {
                api_key: Some("sk-test".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        AppState::from_parts(
            config,
            Arc::new(store),
            Arc::new(provider),
            Arc::new(MonotonicClock::system()),
        )
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = router(test_state(ScriptedProvider::new()).await);
        let (status, body) = send(app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn status_reports_provider_and_model() {
        let app = router(test_state(ScriptedProvider::new()).await);
        let (status, body) = send(app, get("/api/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider"], "scripted");
        assert_eq!(body["provider_reachable"], true);
        assert_eq!(body["model"], "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn index_serves_chat_page() {
        let app = router(test_state(ScriptedProvider::new()).await);
        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("/ws"));
    }

    #[tokio::test]
    async fn chat_assigns_session_and_persists_turn() {
        let state = test_state(ScriptedProvider::new()).await;
        let app = router(state.clone());

        let (status, body) = send(app.clone(), post_json("/api/chat", json!({"message": "hello"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], "reply 1");
        let session_id = body["session_id"].as_str().unwrap().to_string();
        assert!(Uuid::parse_str(&session_id).is_ok());

        let (status, body) = send(app, get(&format!("/api/sessions/{}/messages", session_id))).await;
        assert_eq!(status, StatusCode::OK);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "hello");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"], "reply 1");
    }

    #[tokio::test]
    async fn blank_message_is_bad_request() {
        let state = test_state(ScriptedProvider::new()).await;
        let app = router(state.clone());

        let (status, body) = send(
            app,
            post_json("/api/chat", json!({"session_id": "s1", "message": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(state.history.query_ordered("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_chat_body_is_json_bad_request() {
        let app = router(test_state(ScriptedProvider::new()).await);
        let request = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn delete_waits_for_the_running_turn() {
        let provider = ScriptedProvider::new().with_delay(std::time::Duration::from_millis(200));
        let state = test_state(provider).await;
        let app = router(state.clone());

        let turn = {
            let state = state.clone();
            tokio::spawn(async move { state.window.handle_turn("s1", "hello").await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let request = Request::builder()
            .method("DELETE")
            .uri("/api/sessions/s1")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, request).await;
        turn.await.unwrap().unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], 2);
        assert!(state.history.query_ordered("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn completion_failure_is_bad_gateway() {
        let provider = ScriptedProvider::new();
        provider.set_chat_failure(true);
        let state = test_state(provider).await;
        let app = router(state.clone());

        let (status, _) = send(
            app,
            post_json("/api/chat", json!({"session_id": "s1", "message": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let stored = state.history.query_ordered("s1").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text, "hi");
    }

    #[tokio::test]
    async fn delete_clears_session() {
        let state = test_state(ScriptedProvider::new()).await;
        let app = router(state.clone());

        send(
            app.clone(),
            post_json("/api/chat", json!({"session_id": "s1", "message": "hi"})),
        )
        .await;

        let request = Request::builder()
            .method("DELETE")
            .uri("/api/sessions/s1")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["deleted"], 2);
        assert!(state.history.query_ordered("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_session_returns_uuid() {
        let app = router(test_state(ScriptedProvider::new()).await);
        let request = Request::builder()
            .method("POST")
            .uri("/api/sessions")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(Uuid::parse_str(body["session_id"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = router(test_state(ScriptedProvider::new()).await);
        let (status, body) = send(app, get("/api/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("/api/nope"));
    }
}
