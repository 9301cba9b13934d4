//! Core types for the speech bridge
//!
//! This crate provides the shared data model used across all other crates:
//! - Normalized translation events and provider tokens
//! - Stream lifecycle states and metrics
//! - Provider capability and health types
//! - Language code normalization
//! - The ordered stream event channel

pub mod capabilities;
pub mod error;
pub mod events;
pub mod language;
pub mod metrics;
pub mod state;
pub mod token;

pub use capabilities::{ProviderCapabilities, ProviderHealthStatus};
pub use error::CoreError;
pub use events::{stream_event_channel, StreamEvent, StreamEventSender, TranslationEvent};
pub use language::{expand_locale, normalize, LanguagePair, AUTO_SOURCE};
pub use metrics::{StreamHealth, StreamMetrics, StreamMetricsSnapshot};
pub use state::StreamState;
pub use token::{Token, TokenStatus};

/// Audio sample rate expected on every stream (Hz).
pub const SAMPLE_RATE: u32 = 16_000;

/// Bytes per PCM sample (16-bit signed little-endian, mono).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Options for creating a translation stream.
///
/// Immutable once the stream is created. `events` is the sending half of the
/// stream event channel; the receiving half stays with the session layer.
pub struct TranslationStreamOptions {
    /// Unique stream id (caller-assigned, stable across reconnects)
    pub stream_id: String,
    /// The subscription this stream serves (canonical subscription string)
    pub subscription_key: String,
    /// Normalized source language, or [`AUTO_SOURCE`] for any-language
    pub source_language: String,
    /// Normalized target language
    pub target_language: String,
    /// Ordered event channel to the session layer
    pub events: StreamEventSender,
}

impl std::fmt::Debug for TranslationStreamOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationStreamOptions")
            .field("stream_id", &self.stream_id)
            .field("subscription_key", &self.subscription_key)
            .field("source_language", &self.source_language)
            .field("target_language", &self.target_language)
            .finish()
    }
}
