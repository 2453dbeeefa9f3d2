use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value that failed to parse.
        value: String,
    },
}

/// Runtime configuration for the Docdigest server and CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Base URL of the local Ollama runtime serving both models.
    pub ollama_url: String,
    /// Model used to summarize chunks and condense combined summaries.
    pub summarization_model: String,
    /// Sampling temperature for summarization calls.
    pub summary_temperature: f32,
    /// Model used to answer follow-up questions.
    pub qa_model: String,
    /// Model or encoding name resolved by the tokenizer.
    pub tokenizer_model: String,
    /// Input-token ceiling for a single summarization chunk.
    pub summary_chunk_tokens: usize,
    /// Number of chunk summaries allowed in flight at once.
    pub summary_concurrency: usize,
    /// Inputs with fewer words are rejected as too short to summarize.
    pub min_input_words: usize,
    /// Word limit applied to the stored document before it is embedded in a QA prompt.
    pub qa_context_words: usize,
    /// Optional token ceiling applied to the QA context after word truncation.
    pub qa_context_tokens: Option<usize>,
    /// Number of recent chat entries replayed inside the QA prompt.
    pub qa_prompt_history: usize,
    /// Maximum number of chat entries retained in the session.
    pub chat_history_limit: usize,
    /// Whether QA generation samples (otherwise greedy).
    pub qa_do_sample: bool,
    /// QA sampling temperature.
    pub qa_temperature: f32,
    /// QA nucleus sampling threshold.
    pub qa_top_p: f32,
    /// Maximum number of tokens generated for an answer.
    pub qa_max_new_tokens: usize,
    /// Request body limit for PDF uploads.
    pub max_upload_bytes: usize,
    /// Default log level or filter directives, used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Fixed log file to append to. When unset, logs rotate daily inside `log_dir`.
    pub log_file: Option<String>,
    /// Directory for rotated log files.
    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: None,
            ollama_url: "http://127.0.0.1:11434".into(),
            summarization_model: "llama3.2".into(),
            summary_temperature: 0.1,
            qa_model: "llama3.2".into(),
            tokenizer_model: "cl100k_base".into(),
            summary_chunk_tokens: 1024,
            summary_concurrency: 1,
            min_input_words: 20,
            qa_context_words: 500,
            qa_context_tokens: None,
            qa_prompt_history: 6,
            chat_history_limit: 20,
            qa_do_sample: true,
            qa_temperature: 0.7,
            qa_top_p: 0.9,
            qa_max_new_tokens: 150,
            max_upload_bytes: 25 * 1024 * 1024,
            log_level: "info".into(),
            log_file: None,
            log_dir: "logs".into(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            server_port: parse_optional("SERVER_PORT")?,
            ollama_url: load_env_optional("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            summarization_model: load_env_optional("SUMMARIZATION_MODEL")
                .unwrap_or(defaults.summarization_model),
            summary_temperature: parse_or("SUMMARY_TEMPERATURE", defaults.summary_temperature)?,
            qa_model: load_env_optional("QA_MODEL").unwrap_or(defaults.qa_model),
            tokenizer_model: load_env_optional("TOKENIZER_MODEL")
                .unwrap_or(defaults.tokenizer_model),
            summary_chunk_tokens: parse_or("SUMMARY_CHUNK_TOKENS", defaults.summary_chunk_tokens)?,
            summary_concurrency: parse_or("SUMMARY_CONCURRENCY", defaults.summary_concurrency)?
                .max(1),
            min_input_words: parse_or("MIN_INPUT_WORDS", defaults.min_input_words)?,
            qa_context_words: parse_or("QA_CONTEXT_WORDS", defaults.qa_context_words)?,
            qa_context_tokens: parse_optional("QA_CONTEXT_TOKENS")?,
            qa_prompt_history: parse_or("QA_PROMPT_HISTORY", defaults.qa_prompt_history)?,
            chat_history_limit: parse_or("CHAT_HISTORY_LIMIT", defaults.chat_history_limit)?,
            qa_do_sample: parse_or("QA_DO_SAMPLE", defaults.qa_do_sample)?,
            qa_temperature: parse_or("QA_TEMPERATURE", defaults.qa_temperature)?,
            qa_top_p: parse_or("QA_TOP_P", defaults.qa_top_p)?,
            qa_max_new_tokens: parse_or("QA_MAX_NEW_TOKENS", defaults.qa_max_new_tokens)?,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            log_level: load_env_optional("DOCDIGEST_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_file: load_env_optional("DOCDIGEST_LOG_FILE"),
            log_dir: load_env_optional("DOCDIGEST_LOG_DIR").unwrap_or(defaults.log_dir),
        })
    }

    /// Log the settings that shape a run. Call once tracing is installed.
    pub fn log_summary(&self) {
        tracing::info!(
            ollama_url = %self.ollama_url,
            summarization_model = %self.summarization_model,
            qa_model = %self.qa_model,
            tokenizer = %self.tokenizer_model,
            chunk_tokens = self.summary_chunk_tokens,
            concurrency = self.summary_concurrency,
            server_port = ?self.server_port,
            "Loaded configuration"
        );
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            })
        })
        .transpose()
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    Ok(parse_optional(key)?.unwrap_or(default))
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment and install it in the global cache.
///
/// A second call keeps the configuration installed by the first.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    Ok(CONFIG.get_or_init(|| config))
}
