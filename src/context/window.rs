//! Conversation window manager.
//!
//! Handles one chat turn end to end:
//! - persists the user message
//! - folds everything but the most recent messages into a running summary
//!   once the session grows past the threshold
//! - assembles the context window and asks the model for a reply
//! - persists the reply

use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::core::errors::{ChatError, HistoryError};
use crate::history::{HistoryStore, Message, MonotonicClock, Role};
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

use super::locks::SessionLocks;
use super::summarizer::Summarizer;

#[derive(Debug, Clone)]
pub struct WindowSettings {
    /// Summarize when a session holds more than this many messages.
    pub summarization_threshold: usize,
    /// Most recent messages never folded into a summary.
    pub recent_keep: usize,
    pub summary_prefix: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub max_input_chars: usize,
}

impl WindowSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            summarization_threshold: config.summarization.threshold,
            recent_keep: config.summarization.recent_keep,
            summary_prefix: config.summarization.prefix.clone(),
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            max_input_chars: config.chat.max_input_chars,
        }
    }
}

/// What the summarization check did to a session's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compaction {
    /// The session is still within the threshold.
    NotNeeded,
    /// Older messages were replaced by one summary message.
    Applied { removed: u64 },
    /// The summarizer produced nothing; history is unchanged.
    Skipped,
}

pub struct WindowManager {
    history: Arc<dyn HistoryStore>,
    provider: Arc<dyn LlmProvider>,
    summarizer: Summarizer,
    clock: Arc<MonotonicClock>,
    settings: WindowSettings,
    locks: SessionLocks,
}

impl WindowManager {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        provider: Arc<dyn LlmProvider>,
        summarizer: Summarizer,
        clock: Arc<MonotonicClock>,
        settings: WindowSettings,
    ) -> Self {
        Self {
            history,
            provider,
            summarizer,
            clock,
            settings,
            locks: SessionLocks::new(),
        }
    }

    pub fn from_config(
        history: Arc<dyn HistoryStore>,
        provider: Arc<dyn LlmProvider>,
        clock: Arc<MonotonicClock>,
        config: &AppConfig,
    ) -> Self {
        let summarizer = Summarizer::from_config(provider.clone(), config);
        Self::new(
            history,
            provider,
            summarizer,
            clock,
            WindowSettings::from_config(config),
        )
    }

    pub fn settings(&self) -> &WindowSettings {
        &self.settings
    }

    /// Runs one turn and returns the bot reply.
    pub async fn handle_turn(&self, session_id: &str, user_text: &str) -> Result<String, ChatError> {
        self.validate(session_id, user_text)?;

        let _session = self.locks.lock(session_id).await;

        self.history
            .append(session_id, Role::User, user_text, self.clock.next())
            .await?;

        let mut messages = self.history.query_ordered(session_id).await?;
        if let Some(last) = messages.last() {
            self.clock.observe(last.timestamp);
        }

        let compaction = self.compact(session_id, &messages).await?;
        if let Compaction::Applied { removed } = compaction {
            tracing::info!(session_id, removed, "Summarized older conversation history");
            messages = self.history.query_ordered(session_id).await?;
        }

        let window = build_window(&messages, user_text);
        tracing::debug!(session_id, entries = window.len(), "Sending context window");

        let request = ChatRequest::new(window)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);

        let reply = match self.provider.chat(request, &self.settings.model).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(session_id, "Completion failed: {}", err);
                return Err(err.into());
            }
        };

        self.history
            .append(session_id, Role::Bot, &reply, self.clock.next())
            .await?;

        Ok(reply)
    }

    /// Deletes a session's whole history once any in-flight turn on it has finished.
    pub async fn clear_session(&self, session_id: &str) -> Result<u64, HistoryError> {
        let _session = self.locks.lock(session_id).await;
        let deleted = self.history.delete_before(session_id, i64::MAX).await?;
        tracing::info!(session_id, deleted, "Cleared session history");
        Ok(deleted)
    }

    /// Replaces all but the most recent messages with one summary once the
    /// session exceeds the threshold. `messages` must be the session's full
    /// ordered history.
    pub async fn compact(
        &self,
        session_id: &str,
        messages: &[Message],
    ) -> Result<Compaction, HistoryError> {
        let keep = self.settings.recent_keep;
        if messages.len() <= self.settings.summarization_threshold || messages.len() <= keep {
            return Ok(Compaction::NotNeeded);
        }

        let split = messages.len() - keep;
        let (older, recent) = messages.split_at(split);

        let Some(summary) = self.summarizer.summarize(older).await else {
            return Ok(Compaction::Skipped);
        };

        let cutoff = recent[0].timestamp;
        let replacement = Message {
            session_id: session_id.to_string(),
            role: Role::Bot,
            text: format!("{}{}", self.settings.summary_prefix, summary),
            timestamp: self.clock.next(),
        };

        let removed = self
            .history
            .replace_before(session_id, cutoff, &replacement)
            .await?;
        Ok(Compaction::Applied { removed })
    }

    fn validate(&self, session_id: &str, user_text: &str) -> Result<(), ChatError> {
        if session_id.trim().is_empty() {
            return Err(ChatError::InvalidInput("session id is required".to_string()));
        }
        if user_text.trim().is_empty() {
            return Err(ChatError::InvalidInput("message cannot be empty".to_string()));
        }
        let length = user_text.chars().count();
        if length > self.settings.max_input_chars {
            return Err(ChatError::InvalidInput(format!(
                "message is too long ({} characters, limit {})",
                length, self.settings.max_input_chars
            )));
        }
        Ok(())
    }
}

/// Maps stored messages to completion roles and ends the window with the live user turn.
pub fn build_window(messages: &[Message], user_text: &str) -> Vec<ChatMessage> {
    let mut window: Vec<ChatMessage> = messages.iter().map(ChatMessage::from).collect();
    window.push(ChatMessage::user(user_text));
    window
}
