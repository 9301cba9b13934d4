//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Provider credentials and endpoints
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Stream behavior tuning
    #[serde(default)]
    pub streams: StreamTuning,
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in &self.providers.preferred {
            match name.as_str() {
                "azure" | "soniox" => {}
                other => {
                    return Err(ConfigError::InvalidValue {
                        field: "providers.preferred".to_string(),
                        message: format!("Unknown provider '{}'", other),
                    });
                }
            }
        }

        if self.providers.preferred.iter().any(|p| p == "azure")
            && self.providers.azure.key.is_empty()
        {
            return Err(ConfigError::MissingValue {
                field: "providers.azure.key".to_string(),
            });
        }

        if self.providers.preferred.iter().any(|p| p == "soniox")
            && self.providers.soniox.api_key.is_empty()
        {
            return Err(ConfigError::MissingValue {
                field: "providers.soniox.api_key".to_string(),
            });
        }

        if self.streams.translation_wait_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "streams.translation_wait_ms".to_string(),
                message: "Translation wait timeout must be non-zero".to_string(),
            });
        }

        if self.streams.max_reconnect_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "streams.max_reconnect_attempts".to_string(),
                message: "At least one reconnect attempt is required".to_string(),
            });
        }

        Ok(())
    }
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Provider preference order for stream creation
    #[serde(default = "default_preferred")]
    pub preferred: Vec<String>,

    /// Continuous-recognizer provider
    #[serde(default)]
    pub azure: AzureConfig,

    /// Token-stream provider
    #[serde(default)]
    pub soniox: SonioxConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            preferred: default_preferred(),
            azure: AzureConfig::default(),
            soniox: SonioxConfig::default(),
        }
    }
}

fn default_preferred() -> Vec<String> {
    vec!["soniox".to_string(), "azure".to_string()]
}

/// Continuous-recognizer provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    /// Subscription key (set via SPEECH_BRIDGE__PROVIDERS__AZURE__KEY)
    #[serde(default)]
    pub key: String,

    /// Service region
    #[serde(default = "default_azure_region")]
    pub region: String,

    /// Upper bound on concurrently open streams
    #[serde(default = "default_max_streams")]
    pub max_concurrent_streams: usize,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            region: default_azure_region(),
            max_concurrent_streams: default_max_streams(),
        }
    }
}

fn default_azure_region() -> String {
    "eastus".to_string()
}

/// Token-stream provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SonioxConfig {
    /// API key (set via SPEECH_BRIDGE__PROVIDERS__SONIOX__API_KEY)
    #[serde(default)]
    pub api_key: String,

    /// WebSocket endpoint
    #[serde(default = "default_soniox_endpoint")]
    pub endpoint: String,

    /// Realtime model name
    #[serde(default = "default_soniox_model")]
    pub model: String,

    /// Upper bound on concurrently open streams
    #[serde(default = "default_max_streams")]
    pub max_concurrent_streams: usize,
}

impl Default for SonioxConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_soniox_endpoint(),
            model: default_soniox_model(),
            max_concurrent_streams: default_max_streams(),
        }
    }
}

fn default_soniox_endpoint() -> String {
    "wss://stt-rt.soniox.com/transcribe-websocket".to_string()
}

fn default_soniox_model() -> String {
    "stt-rt-preview".to_string()
}

fn default_max_streams() -> usize {
    50
}

/// Stream behavior tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamTuning {
    /// How long an utterance waits for translation tokens before it is
    /// flushed untranslated (ms)
    #[serde(default = "default_translation_wait")]
    pub translation_wait_ms: u64,

    /// Settle delay after the config message before the stream is ready (ms)
    #[serde(default = "default_ready_settle")]
    pub ready_settle_ms: u64,

    /// Maximum sequential reconnect attempts per stream
    #[serde(default = "default_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Base backoff between reconnect attempts (ms); grows linearly
    #[serde(default = "default_reconnect_backoff")]
    pub reconnect_backoff_ms: u64,

    /// End-of-utterance sentinel token text
    #[serde(default = "default_end_token")]
    pub end_token: String,
}

impl Default for StreamTuning {
    fn default() -> Self {
        Self {
            translation_wait_ms: default_translation_wait(),
            ready_settle_ms: default_ready_settle(),
            max_reconnect_attempts: default_reconnect_attempts(),
            reconnect_backoff_ms: default_reconnect_backoff(),
            end_token: default_end_token(),
        }
    }
}

fn default_translation_wait() -> u64 {
    3000
}
fn default_ready_settle() -> u64 {
    200
}
fn default_reconnect_attempts() -> u32 {
    3
}
fn default_reconnect_backoff() -> u64 {
    1000
}
fn default_end_token() -> String {
    "<end>".to_string()
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (SPEECH_BRIDGE_ prefix)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("SPEECH_BRIDGE")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
