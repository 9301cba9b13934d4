//! Configuration for the speech bridge
//!
//! Settings are loaded from config files with environment-variable
//! overrides (`SPEECH_BRIDGE__` prefix) and validated before use.

mod settings;

pub use settings::{
    load_settings, AzureConfig, ProvidersConfig, Settings, SonioxConfig, StreamTuning,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required value: {field}")]
    MissingValue { field: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
