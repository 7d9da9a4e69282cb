//! Application configuration model.
//!
//! Every field has a default, so an absent or partial `config.toml` is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CLASSIFIER_MODEL: &str = "cardiffnlp/twitter-roberta-base-sentiment-latest";
pub const DEFAULT_TOKENIZER_FALLBACK: &str = "FacebookAI/roberta-base";
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_CHAT_MODEL: &str = "llama3";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub classifier: ClassifierConfig,
    pub generation: GenerationConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Hugging Face repository of the sequence classifier.
    pub model_id: String,
    /// Repository to take `tokenizer.json` from when the model ships none.
    pub tokenizer_fallback_id: String,
    /// Longest input, in tokens, fed to the model.
    pub max_tokens: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_CLASSIFIER_MODEL.to_string(),
            tokenizer_fallback_id: DEFAULT_TOKENIZER_FALLBACK.to_string(),
            max_tokens: 512,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of the local completion server.
    pub endpoint: String,
    pub model: String,
    /// Longest wait for a connection or for the next bytes of a reply.
    /// A reply that keeps streaming is never cut off.
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Session directory. `None` means `<config_dir>/sessions`.
    pub sessions_dir: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, overridden by `RUST_LOG`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
