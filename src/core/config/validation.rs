use super::types::AppConfig;
use super::ConfigError;

const MAX_TEMPERATURE: f64 = 2.0;
const MAX_TIMEOUT_SECS: u64 = 86_400;
const MAX_INPUT_CHARS: usize = 1_000_000;

/// Rejects configurations the service cannot run with.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let api_key = config.llm.api_key.as_deref().unwrap_or("");
    if api_key.trim().is_empty() {
        return Err(ConfigError::Missing(
            "llm.api_key (or OPENAI_API_KEY)".to_string(),
        ));
    }

    validate_non_empty("llm.model", &config.llm.model)?;
    validate_non_empty("llm.base_url", &config.llm.base_url)?;
    if !config.llm.base_url.starts_with("http://") && !config.llm.base_url.starts_with("https://")
    {
        return Err(invalid("llm.base_url", "must start with http:// or https://"));
    }
    validate_temperature("llm.temperature", config.llm.temperature)?;
    validate_range(
        "llm.request_timeout_secs",
        config.llm.request_timeout_secs,
        1,
        MAX_TIMEOUT_SECS,
    )?;
    if config.llm.max_tokens == Some(0) {
        return Err(invalid("llm.max_tokens", "must be at least 1"));
    }

    let summarization = &config.summarization;
    if summarization.threshold == 0 {
        return Err(invalid("summarization.threshold", "must be at least 1"));
    }
    if summarization.recent_keep == 0 {
        return Err(invalid("summarization.recent_keep", "must be at least 1"));
    }
    if summarization.max_tokens == 0 {
        return Err(invalid("summarization.max_tokens", "must be at least 1"));
    }
    validate_temperature("summarization.temperature", summarization.temperature)?;

    if config.chat.max_input_chars == 0 || config.chat.max_input_chars > MAX_INPUT_CHARS {
        return Err(invalid(
            "chat.max_input_chars",
            &format!("must be between 1 and {}", MAX_INPUT_CHARS),
        ));
    }

    validate_non_empty("server.host", &config.server.host)?;
    for (index, origin) in config.server.allowed_origins.iter().enumerate() {
        if origin.trim().is_empty() {
            return Err(invalid(
                &format!("server.allowed_origins[{}]", index),
                "value cannot be empty",
            ));
        }
    }

    Ok(())
}

fn validate_non_empty(path: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(path, "value cannot be empty"));
    }
    Ok(())
}

fn validate_temperature(path: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=MAX_TEMPERATURE).contains(&value) {
        return Err(invalid(
            path,
            &format!("must be between 0 and {}", MAX_TEMPERATURE),
        ));
    }
    Ok(())
}

fn validate_range(path: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(invalid(path, &format!("must be between {} and {}", min, max)));
    }
    Ok(())
}

fn invalid(path: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
