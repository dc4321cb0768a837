use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::config::LlmConfig;
use crate::core::errors::CompletionError;

/// Client for OpenAI-compatible `/v1/chat/completions` endpoints.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
            client,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone().unwrap_or_default(),
            config.request_timeout(),
        )
    }

    fn request_error(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout(self.timeout)
        } else {
            CompletionError::Transport(err.to_string())
        }
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

fn build_body(request: &ChatRequest, model_id: &str) -> Value {
    let mut body = json!({
        "model": model_id,
        "messages": request.messages,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature {
            obj.insert("temperature".to_string(), json!(t));
        }
        if let Some(t) = request.max_tokens {
            obj.insert("max_tokens".to_string(), json!(t));
        }
    }

    body
}

fn extract_content(payload: CompletionResponse) -> Result<String, CompletionError> {
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| CompletionError::Malformed("response has no message content".to_string()))
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);
        let res = self.client.get(&url).bearer_auth(&self.api_key).send().await;
        match res {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, CompletionError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = build_body(&request, model_id);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let payload: CompletionResponse = res
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        extract_content(payload)
    }
}
