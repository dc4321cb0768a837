use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::defaults;

/// Fully resolved runtime configuration, built once at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub summarization: SummarizationConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::host")]
    pub host: String,
    #[serde(default = "defaults::port")]
    pub port: u16,
    /// Origins accepted for CORS and WebSocket upgrades. Empty accepts any.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "defaults::base_url")]
    pub base_url: String,
    #[serde(default = "defaults::model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "defaults::chat_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl LlmConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            model: defaults::model(),
            api_key: None,
            temperature: defaults::chat_temperature(),
            max_tokens: None,
            request_timeout_secs: defaults::request_timeout_secs(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizationConfig {
    /// Summarize once a session holds more than this many messages.
    #[serde(default = "defaults::summarization_threshold")]
    pub threshold: usize,
    /// Most recent messages that are never folded into the summary.
    #[serde(default = "defaults::recent_keep")]
    pub recent_keep: usize,
    #[serde(default = "defaults::summary_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "defaults::summary_temperature")]
    pub temperature: f64,
    #[serde(default = "defaults::summary_prefix")]
    pub prefix: String,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::summarization_threshold(),
            recent_keep: defaults::recent_keep(),
            max_tokens: defaults::summary_max_tokens(),
            temperature: defaults::summary_temperature(),
            prefix: defaults::summary_prefix(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "defaults::max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_input_chars: defaults::max_input_chars(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryConfig {
    /// Overrides the database location derived from the data directory.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}
