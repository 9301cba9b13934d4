//! Provider and stream traits
//!
//! One interface, two concrete variants selected at construction time: the
//! continuous-recognizer provider and the raw token-stream provider.
//! Capability queries are data (static tables), not behavior.

use async_trait::async_trait;

use speech_bridge_core::{
    ProviderCapabilities, ProviderHealthStatus, StreamHealth, StreamMetricsSnapshot, StreamState,
    TranslationStreamOptions,
};

use crate::ProviderError;

/// A translation provider: validates language pairs, opens streams, and
/// tracks its own health.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Stable provider name used in events and logs.
    fn name(&self) -> &'static str;

    /// Validate credentials and config. Fails with
    /// [`ProviderError::Initialization`] when required config is missing.
    async fn initialize(&self) -> Result<(), ProviderError>;

    /// Whether the provider can translate `source` into `target`. Both codes
    /// are normalized; equal codes are never supported.
    fn supports_language_pair(&self, source: &str, target: &str) -> bool;

    /// Whether the any-language source sentinel is supported.
    fn supports_auto_detection(&self) -> bool;

    /// The provider's static capability tables.
    fn capabilities(&self) -> &ProviderCapabilities;

    /// Open one upstream connection for the given options.
    ///
    /// Fails with [`ProviderError::InvalidLanguagePair`] when
    /// `supports_language_pair` is false for the requested pair.
    async fn create_translation_stream(
        &self,
        options: TranslationStreamOptions,
    ) -> Result<Box<dyn TranslationStream>, ProviderError>;

    /// Current health snapshot.
    fn health(&self) -> ProviderHealthStatus;

    /// Record a successful provider operation.
    fn record_success(&self);

    /// Record a failed provider operation.
    fn record_failure(&self, reason: &str);

    /// Release provider resources. Idempotent.
    async fn dispose(&self);
}

/// One upstream duplex connection with a lifecycle state machine.
///
/// Streams are never reused across reconnects: reconnection replaces the
/// internal transport but keeps the public id and state identity. A stream
/// that reaches `Error` is replaced by the caller, never revived.
#[async_trait]
pub trait TranslationStream: Send + Sync {
    /// The caller-assigned stream id.
    fn stream_id(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> StreamState;

    /// Push one audio chunk (PCM S16LE, 16 kHz, mono) toward the upstream.
    ///
    /// Returns `false` (and counts a drop) instead of erroring when the
    /// stream cannot accept audio. Never blocks beyond local buffering.
    async fn write_audio(&self, chunk: &[u8]) -> bool;

    /// Close the stream. Idempotent: the second call is a no-op. Buffered
    /// utterance data is flushed as final events before teardown.
    async fn close(&self);

    /// Point-in-time metrics copy.
    fn metrics(&self) -> StreamMetricsSnapshot;

    /// Health view combining stream and provider state.
    fn health(&self) -> StreamHealth;
}
