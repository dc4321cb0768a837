//! Condenses old conversation history into a short text.
//!
//! Summaries are an optimization: callers use [`Summarizer::summarize`],
//! which turns every failure into `None` and leaves the history untouched.

use std::sync::Arc;

use thiserror::Error;

use crate::core::config::{AppConfig, SummarizationConfig};
use crate::core::errors::CompletionError;
use crate::history::Message;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a summarization assistant.";
pub const SUMMARY_INSTRUCTION: &str = "Summarize the following conversation in a few sentences:";

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("no messages to summarize")]
    NothingToSummarize,
    #[error("summary request failed: {0}")]
    Completion(#[from] CompletionError),
    #[error("model returned an empty summary")]
    EmptySummary,
}

pub struct Summarizer {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl Summarizer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        config: &SummarizationConfig,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    pub fn from_config(provider: Arc<dyn LlmProvider>, config: &AppConfig) -> Self {
        Self::new(provider, config.llm.model.clone(), &config.summarization)
    }

    /// Returns the summary, or `None` when the model could not produce one.
    pub async fn summarize(&self, messages: &[Message]) -> Option<String> {
        match self.try_summarize(messages).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                tracing::warn!("Skipping summarization: {}", err);
                None
            }
        }
    }

    pub async fn try_summarize(&self, messages: &[Message]) -> Result<String, SummarizeError> {
        if messages.is_empty() {
            return Err(SummarizeError::NothingToSummarize);
        }

        let prompt = build_prompt(messages);
        tracing::debug!(messages = messages.len(), "Sending summarization prompt");

        let request = ChatRequest::new(vec![
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ])
        .with_temperature(self.temperature)
        .with_max_tokens(Some(self.max_tokens));

        let response = self.provider.chat(request, &self.model).await?;
        let summary = response.trim();
        if summary.is_empty() {
            return Err(SummarizeError::EmptySummary);
        }

        tracing::debug!(chars = summary.len(), "Received summary");
        Ok(summary.to_string())
    }
}

/// One `"<role>: <text>"` line per message after the fixed instruction.
pub fn build_prompt(messages: &[Message]) -> String {
    let mut prompt = format!("{}\n\n", SUMMARY_INSTRUCTION);
    for message in messages {
        prompt.push_str(&format!("{}: {}\n", message.role, message.text));
    }
    prompt
}
