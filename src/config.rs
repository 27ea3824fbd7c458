use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_DATA_DIR: &str = "tf_projects";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_INDEX_API_URL: &str = "https://api.dify.ai/v1";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Placeholder credential shipped in sample `.env` files; treated as "not configured".
pub const DEMO_API_KEY: &str = "demo_key";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration, built once at process entry and passed into each component.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root directory holding one subdirectory per project.
    pub data_dir: PathBuf,
    /// Language-model provider settings.
    pub llm: LlmSettings,
    /// Knowledge-index settings used by the publisher.
    pub index: IndexSettings,
    /// Chat channel settings used by the notifier.
    pub channel: ChannelSettings,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Settings for the chat-completion provider.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    /// Bearer credential; `None` selects demo mode.
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Chat model identifier.
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Settings for the external knowledge index.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexSettings {
    /// API root, also requested once as a liveness check before publishing.
    pub base_url: String,
    /// Bearer credential for the dataset API.
    pub api_key: Option<String>,
    /// Target dataset identifier.
    pub dataset_id: Option<String>,
}

/// Settings for the chat-channel webhook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelSettings {
    /// Webhook URL that accepts a single text block.
    pub webhook_url: Option<String>,
    /// Value sent in the client-id header.
    pub client_id: Option<String>,
    /// Value sent in the client-secret header.
    pub client_secret: Option<String>,
}

impl LlmSettings {
    /// Whether a live credential is configured.
    pub fn is_live(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INDEX_API_URL.to_string(),
            api_key: None,
            dataset_id: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            llm: LlmSettings::default(),
            index: IndexSettings::default(),
            channel: ChannelSettings::default(),
            server_port: None,
        }
    }
}

impl Config {
    /// Read `.env` (when present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Emit one debug event describing the configuration. Credentials are never logged.
    ///
    /// Call after tracing is initialised.
    pub fn log_summary(&self) {
        tracing::debug!(
            data_dir = %self.data_dir.display(),
            llm_live = self.llm.is_live(),
            model = %self.llm.model,
            index_configured = self.index.dataset_id.is_some(),
            channel_configured = self.channel.webhook_url.is_some(),
            server_port = ?self.server_port,
            "Loaded configuration"
        );
    }

    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = load_env_optional("LLM_TIMEOUT_SECS")
            .map(|value| {
                value
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidValue("LLM_TIMEOUT_SECS".into()))
            })
            .transpose()?
            .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);

        Ok(Self {
            data_dir: load_env_optional("TF_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            llm: LlmSettings {
                api_key: load_env_optional("OPENAI_API_KEY").filter(|key| key != DEMO_API_KEY),
                base_url: load_env_optional("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                model: load_env_optional("OPENAI_MODEL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            index: IndexSettings {
                base_url: load_env_optional("INDEX_API_URL")
                    .unwrap_or_else(|| DEFAULT_INDEX_API_URL.to_string()),
                api_key: load_env_optional("INDEX_API_KEY"),
                dataset_id: load_env_optional("INDEX_DATASET_ID"),
            },
            channel: ChannelSettings {
                webhook_url: load_env_optional("CHANNEL_WEBHOOK_URL"),
                client_id: load_env_optional("CHANNEL_CLIENT_ID"),
                client_secret: load_env_optional("CHANNEL_CLIENT_SECRET"),
            },
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[test]
    fn defaults_select_demo_mode() {
        let config = Config::default();
        assert!(!config.llm.is_live());
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.data_dir, PathBuf::from("tf_projects"));
        assert!(config.index.dataset_id.is_none());
        assert!(config.channel.webhook_url.is_none());
    }

    #[test]
    fn blank_values_are_ignored() {
        // Keys are unique to this test so parallel tests never observe them.
        // SAFETY: only this test touches these variables.
        unsafe {
            env::set_var("TF_DIGEST_TEST_BLANK", "   ");
        }
        assert!(load_env_optional("TF_DIGEST_TEST_BLANK").is_none());
        assert!(load_env_optional("TF_DIGEST_TEST_MISSING").is_none());
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn summary_reaches_subscriber_without_secrets() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-live-secret".into());
        config.channel.client_secret = Some("channel-secret".into());

        let captured = CapturedLog::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || config.log_summary());

        let output = String::from_utf8(captured.0.lock().expect("log buffer").clone())
            .expect("utf8 log");
        assert!(output.contains("Loaded configuration"));
        assert!(output.contains("llm_live=true"));
        assert!(!output.contains("sk-live-secret"));
        assert!(!output.contains("channel-secret"));
    }
}
