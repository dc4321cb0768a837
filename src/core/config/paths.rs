use std::env;
use std::fs;
use std::path::PathBuf;

/// Filesystem locations resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    /// `CHAT_RELAY_DATA_DIR` wins; otherwise data lives in `.data` under the
    /// working directory.
    pub fn new() -> Self {
        let project_root = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let user_data_dir = env::var("CHAT_RELAY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| project_root.join(".data"));
        Self::with_data_dir(project_root, user_data_dir)
    }

    pub fn with_data_dir(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        if let Err(err) = fs::create_dir_all(&log_dir) {
            eprintln!("Failed to create {}: {}", log_dir.display(), err);
        }

        AppPaths {
            db_path: user_data_dir.join("chat_history.db"),
            secrets_path: user_data_dir.join("secrets.yaml"),
            project_root,
            user_data_dir,
            log_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
