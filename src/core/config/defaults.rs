//! Default values used when `config.yml` omits a field.

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_CHAT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_SUMMARIZATION_THRESHOLD: usize = 10;
pub const DEFAULT_RECENT_KEEP: usize = 5;
pub const DEFAULT_SUMMARY_MAX_TOKENS: u32 = 150;
pub const DEFAULT_SUMMARY_TEMPERATURE: f64 = 0.5;
pub const DEFAULT_SUMMARY_PREFIX: &str = "Summary: ";

pub const DEFAULT_MAX_INPUT_CHARS: usize = 8_000;

pub(crate) fn host() -> String {
    DEFAULT_HOST.to_string()
}

pub(crate) fn port() -> u16 {
    DEFAULT_PORT
}

pub(crate) fn base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

pub(crate) fn model() -> String {
    DEFAULT_MODEL.to_string()
}

pub(crate) fn chat_temperature() -> f64 {
    DEFAULT_CHAT_TEMPERATURE
}

pub(crate) fn request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

pub(crate) fn summarization_threshold() -> usize {
    DEFAULT_SUMMARIZATION_THRESHOLD
}

pub(crate) fn recent_keep() -> usize {
    DEFAULT_RECENT_KEEP
}

pub(crate) fn summary_max_tokens() -> u32 {
    DEFAULT_SUMMARY_MAX_TOKENS
}

pub(crate) fn summary_temperature() -> f64 {
    DEFAULT_SUMMARY_TEMPERATURE
}

pub(crate) fn summary_prefix() -> String {
    DEFAULT_SUMMARY_PREFIX.to_string()
}

pub(crate) fn max_input_chars() -> usize {
    DEFAULT_MAX_INPUT_CHARS
}
