pub mod defaults;
pub mod paths;
pub mod service;
pub mod types;
pub mod validation;

use std::path::PathBuf;

use thiserror::Error;

pub use paths::AppPaths;
pub use service::ConfigService;
pub use types::{AppConfig, ChatConfig, HistoryConfig, LlmConfig, ServerConfig, SummarizationConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("missing required configuration value: {0}")]
    Missing(String),
    #[error("invalid config at '{path}': {reason}")]
    Invalid { path: String, reason: String },
}
