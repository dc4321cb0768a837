use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::context::WindowManager;
use crate::core::config::{AppConfig, AppPaths};
use crate::history::{HistoryStore, MonotonicClock, SqliteHistoryStore};
use crate::llm::{LlmProvider, OpenAiProvider};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub history: Arc<dyn HistoryStore>,
    pub llm: Arc<dyn LlmProvider>,
    pub window: Arc<WindowManager>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Opens the history database, seeds the message clock from it and wires
    /// the window manager to the configured completion endpoint.
    pub async fn initialize(
        paths: &AppPaths,
        config: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        let db_path = config
            .history
            .db_path
            .clone()
            .unwrap_or_else(|| paths.db_path.clone());
        let history = open_history(db_path).await?;

        let clock = Arc::new(MonotonicClock::system());
        let latest = history
            .latest_timestamp()
            .await
            .map_err(|e| InitializationError::History(e.into()))?;
        if let Some(latest) = latest {
            clock.observe(latest);
        }

        let llm: Arc<dyn LlmProvider> = Arc::new(
            OpenAiProvider::from_config(&config.llm)
                .map_err(|e| InitializationError::Llm(e.into()))?,
        );

        Ok(Self::from_parts(config, Arc::new(history), llm, clock))
    }

    pub fn from_parts(
        config: AppConfig,
        history: Arc<dyn HistoryStore>,
        llm: Arc<dyn LlmProvider>,
        clock: Arc<MonotonicClock>,
    ) -> Arc<Self> {
        let window = Arc::new(WindowManager::from_config(
            history.clone(),
            llm.clone(),
            clock,
            &config,
        ));

        Arc::new(AppState {
            config: Arc::new(config),
            history,
            llm,
            window,
            started_at: Utc::now(),
        })
    }
}

async fn open_history(db_path: PathBuf) -> Result<SqliteHistoryStore, InitializationError> {
    let store = SqliteHistoryStore::new(db_path)
        .await
        .map_err(|e| InitializationError::History(e.into()))?;
    tracing::info!("History database at {}", store.db_path().display());
    Ok(store)
}
