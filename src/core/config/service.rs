use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::types::AppConfig;
use super::validation::validate_config;
use super::ConfigError;

#[derive(Clone, Copy)]
enum EnvKind {
    Text,
    Number,
}

/// Environment variables layered over the YAML files.
const ENV_OVERRIDES: [(&str, &[&str], EnvKind); 7] = [
    ("OPENAI_API_KEY", &["llm", "api_key"], EnvKind::Text),
    ("OPENAI_BASE_URL", &["llm", "base_url"], EnvKind::Text),
    ("CHAT_RELAY_MODEL", &["llm", "model"], EnvKind::Text),
    ("CHAT_RELAY_DB_PATH", &["history", "db_path"], EnvKind::Text),
    ("HOST", &["server", "host"], EnvKind::Text),
    ("PORT", &["server", "port"], EnvKind::Number),
    (
        "SUMMARIZATION_THRESHOLD",
        &["summarization", "threshold"],
        EnvKind::Number,
    ),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("CHAT_RELAY_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Loads, merges and validates the configuration from disk and the process environment.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        self.load_with_env(|key| env::var(key).ok())
    }

    pub fn load_with_env<F>(&self, lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        let mut merged = deep_merge(&public_config, &secrets_config);
        apply_env_overrides(&mut merged, lookup);

        let mut config: AppConfig = serde_json::from_value(merged)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        if config.history.db_path.is_none() {
            config.history.db_path = Some(self.paths.db_path.clone());
        }

        validate_config(&config)?;
        Ok(config)
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    match serde_yaml::from_str::<Value>(&contents) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(Value::Null) => Ok(Value::Object(Map::new())),
        Ok(_) => Err(ConfigError::Parse(format!(
            "{}: top level must be a mapping",
            path.display()
        ))),
        Err(err) => Err(ConfigError::Parse(format!("{}: {}", path.display(), err))),
    }
}

fn apply_env_overrides<F>(config: &mut Value, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (var, path, kind) in ENV_OVERRIDES {
        let Some(raw) = lookup(var) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        // unparsable numbers stay strings so serde reports the bad value
        let value = match (kind, raw.parse::<u64>()) {
            (EnvKind::Number, Ok(number)) => Value::from(number),
            _ => Value::String(raw.to_string()),
        };
        ensure_object_path(config, path, value);
    }
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }
    if !config.is_object() {
        *config = Value::Object(Map::new());
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn service_in(dir: &Path) -> ConfigService {
        let paths = AppPaths::with_data_dir(dir.to_path_buf(), dir.to_path_buf());
        ConfigService::new(Arc::new(paths))
    }

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "llm": { "model": "a", "temperature": 0.2 },
            "server": { "allowed_origins": ["http://a"] }
        });
        let override_value = json!({
            "llm": { "model": "b" },
            "server": { "allowed_origins": ["http://b"] },
            "chat": { "max_input_chars": 10 }
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "llm": { "model": "b", "temperature": 0.2 },
                "server": { "allowed_origins": ["http://b"] },
                "chat": { "max_input_chars": 10 }
            })
        );
    }

    #[test]
    fn secrets_file_and_env_layer_over_config_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yml"),
            "llm:\n  model: from-file\nsummarization:\n  threshold: 20\n",
        )
        .unwrap();
        fs::write(dir.path().join("secrets.yaml"), "llm:\n  api_key: sk-file\n").unwrap();

        let env: HashMap<&str, &str> = HashMap::from([("PORT", "8080")]);
        let config = service_in(dir.path())
            .load_with_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.llm.model, "from-file");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.summarization.threshold, 20);
        assert_eq!(config.summarization.recent_keep, 5);
        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.history.db_path,
            Some(dir.path().join("chat_history.db"))
        );
    }

    #[test]
    fn env_api_key_is_enough_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let config = service_in(dir.path())
            .load_with_env(|key| (key == "OPENAI_API_KEY").then(|| "sk-env".to_string()))
            .unwrap();

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.summarization.threshold, 10);
    }

    #[test]
    fn missing_api_key_is_a_startup_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = service_in(dir.path()).load_with_env(|_| None);
        assert!(matches!(result, Err(ConfigError::Missing(_))));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = service_in(dir.path())
            .load_with_env(|key| (key == "OPENAI_API_KEY").then(|| "sk-secret".to_string()))
            .unwrap();

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("****"));
    }
}
