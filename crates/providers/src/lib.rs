//! Translation providers for the speech bridge
//!
//! This crate implements the upstream side of the bridge:
//! - The [`TranslationProvider`]/[`TranslationStream`] traits
//! - Per-provider health tracking
//! - The continuous-recognizer variant ([`azure`])
//! - The raw token-stream variant ([`soniox`]) with utterance assembly
//! - A health-aware provider registry

pub mod azure;
pub mod health;
pub mod provider;
pub mod registry;
pub mod soniox;
mod stream_core;

pub use azure::AzureProvider;
pub use health::ProviderHealthTracker;
pub use provider::{TranslationProvider, TranslationStream};
pub use registry::ProviderRegistry;
pub use soniox::SonioxProvider;

/// Provider errors
#[derive(Debug)]
pub enum ProviderError {
    /// Missing or invalid provider config; fatal to provider startup
    Initialization(String),

    /// The requested pair is outside the provider's capability table.
    /// Retrying with the same pair will not succeed.
    InvalidLanguagePair { source: String, target: String },

    /// Transport-level failure; subject to the bounded reconnect policy
    Connection(String),

    /// Any other upstream fault; terminal for the affected stream
    Runtime(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Initialization(msg) => {
                write!(f, "Provider initialization failed: {msg}")
            }
            ProviderError::InvalidLanguagePair { source, target } => {
                write!(f, "Unsupported language pair: {source} -> {target}")
            }
            ProviderError::Connection(msg) => write!(f, "Connection error: {msg}"),
            ProviderError::Runtime(msg) => write!(f, "Provider runtime error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}
