//! Deterministic collaborators for exercising turns without a network or database.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::summarizer::SUMMARY_SYSTEM_PROMPT;
use crate::core::errors::{CompletionError, HistoryError};
use crate::history::{HistoryStore, Message, Role};
use crate::llm::{ChatRequest, LlmProvider};

pub fn message(session_id: &str, role: Role, text: &str, timestamp: i64) -> Message {
    Message {
        session_id: session_id.to_string(),
        role,
        text: text.to_string(),
        timestamp,
    }
}

/// Replies "reply N" to chat requests and a fixed text to summary requests.
pub struct ScriptedProvider {
    summary: Option<String>,
    fail_chat: AtomicBool,
    delay: Option<Duration>,
    replies: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            summary: Some("The user and the bot exchanged greetings.".to_string()),
            fail_chat: AtomicBool::new(false),
            delay: None,
            replies: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    pub fn failing_summaries(mut self) -> Self {
        self.summary = None;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_chat_failure(&self, fail: bool) {
        self.fail_chat.store(fail, Ordering::SeqCst);
    }

    pub fn summary_requests(&self) -> Vec<ChatRequest> {
        self.requests()
            .into_iter()
            .filter(is_summary_request)
            .collect()
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.requests()
            .into_iter()
            .filter(|r| !is_summary_request(r))
            .collect()
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn is_summary_request(request: &ChatRequest) -> bool {
    request
        .messages
        .first()
        .map(|m| m.role == "system" && m.content == SUMMARY_SYSTEM_PROMPT)
        .unwrap_or(false)
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, CompletionError> {
        let summary_request = is_summary_request(&request);
        self.requests.lock().unwrap().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if summary_request {
            return self
                .summary
                .clone()
                .ok_or_else(|| CompletionError::Transport("summary backend down".to_string()));
        }

        if self.fail_chat.load(Ordering::SeqCst) {
            return Err(CompletionError::Status {
                status: 500,
                body: "upstream exploded".to_string(),
            });
        }

        let n = self.replies.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("reply {}", n))
    }
}

/// Vec-backed store relying on the trait's default `replace_before`.
#[derive(Default)]
pub struct MemoryHistoryStore {
    messages: Mutex<Vec<Message>>,
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(
        &self,
        session_id: &str,
        role: Role,
        text: &str,
        timestamp: i64,
    ) -> Result<(), HistoryError> {
        self.messages
            .lock()
            .unwrap()
            .push(message(session_id, role, text, timestamp));
        Ok(())
    }

    async fn query_ordered(&self, session_id: &str) -> Result<Vec<Message>, HistoryError> {
        let mut messages: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    async fn delete_before(&self, session_id: &str, cutoff: i64) -> Result<u64, HistoryError> {
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| m.session_id != session_id || m.timestamp >= cutoff);
        Ok((before - messages.len()) as u64)
    }
}
