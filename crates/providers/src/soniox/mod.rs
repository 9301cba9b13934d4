//! Raw token-stream provider
//!
//! Speaks a duplex websocket protocol: one JSON configuration message, then
//! binary audio; the upstream answers with token batches that are assembled
//! into utterances client-side. Supports one-way, two-way, and any-source
//! connections.

pub mod assembler;
pub mod protocol;
mod stream;

pub use assembler::{AssemblerAction, FlushReason, UtteranceAssembler};
pub use protocol::TranslationDirective;
pub use stream::SonioxTranslationStream;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use speech_bridge_config::{SonioxConfig, StreamTuning};
use speech_bridge_core::{
    normalize, LanguagePair, ProviderCapabilities, ProviderHealthStatus,
    TranslationStreamOptions,
};

use crate::health::ProviderHealthTracker;
use crate::provider::{TranslationProvider, TranslationStream};
use crate::soniox::stream::ConnectionParams;
use crate::ProviderError;

/// Languages the upstream recognizes and translates between.
const LANGUAGES: &[&str] = &[
    "ar", "de", "en", "es", "fr", "hi", "it", "ja", "ko", "nl", "pl", "pt", "ru", "tr", "zh",
];

/// Pairs supporting bidirectional detection on one connection.
const TWO_WAY_WITH_ENGLISH: &[&str] = &["de", "es", "fr", "it", "pt"];

fn build_capabilities(max_concurrent_streams: usize) -> ProviderCapabilities {
    let mut pairs: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for source in LANGUAGES {
        let targets: Vec<String> = LANGUAGES
            .iter()
            .filter(|t| *t != source)
            .map(|t| t.to_string())
            .collect();
        pairs.insert(source.to_string(), targets);
    }

    let mut caps = ProviderCapabilities {
        supported_language_pairs: pairs,
        supports_auto_detection: true,
        supports_multi_source: true,
        max_concurrent_streams,
        ..Default::default()
    };
    for other in TWO_WAY_WITH_ENGLISH {
        caps.add_two_way_pair("en", other);
    }
    caps
}

/// Token-stream translation provider.
pub struct SonioxProvider {
    config: SonioxConfig,
    tuning: StreamTuning,
    capabilities: ProviderCapabilities,
    health: Arc<ProviderHealthTracker>,
}

impl SonioxProvider {
    pub fn new(config: SonioxConfig, tuning: StreamTuning) -> Self {
        let capabilities = build_capabilities(config.max_concurrent_streams);
        Self {
            config,
            tuning,
            capabilities,
            health: Arc::new(ProviderHealthTracker::new()),
        }
    }
}

#[async_trait]
impl TranslationProvider for SonioxProvider {
    fn name(&self) -> &'static str {
        "soniox"
    }

    async fn initialize(&self) -> Result<(), ProviderError> {
        if self.config.api_key.is_empty() {
            return Err(ProviderError::Initialization(
                "Missing soniox api_key".to_string(),
            ));
        }
        Url::parse(&self.config.endpoint)
            .map_err(|e| ProviderError::Initialization(format!("Invalid soniox endpoint: {}", e)))?;
        tracing::info!("Initialized soniox provider ({})", self.config.endpoint);
        Ok(())
    }

    fn supports_language_pair(&self, source: &str, target: &str) -> bool {
        self.capabilities.supports_pair(source, target)
    }

    fn supports_auto_detection(&self) -> bool {
        self.capabilities.supports_auto_detection
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn create_translation_stream(
        &self,
        options: TranslationStreamOptions,
    ) -> Result<Box<dyn TranslationStream>, ProviderError> {
        let pair = LanguagePair::new(&options.source_language, &options.target_language)
            .map_err(|_| ProviderError::InvalidLanguagePair {
                source: normalize(&options.source_language),
                target: normalize(&options.target_language),
            })?;

        if !self.supports_language_pair(&pair.source, &pair.target) {
            return Err(ProviderError::InvalidLanguagePair {
                source: pair.source,
                target: pair.target,
            });
        }

        let directive =
            TranslationDirective::resolve(&self.capabilities, &pair.source, &pair.target);
        tracing::info!(
            "Creating soniox stream {} ({}, {:?})",
            options.stream_id,
            pair,
            directive
        );

        let params = ConnectionParams {
            endpoint: self.config.endpoint.clone(),
            api_key: self.config.api_key.clone(),
            model: self.config.model.clone(),
            directive,
            end_token: self.tuning.end_token.clone(),
            translation_wait: Duration::from_millis(self.tuning.translation_wait_ms),
            ready_settle: Duration::from_millis(self.tuning.ready_settle_ms),
            max_reconnect_attempts: self.tuning.max_reconnect_attempts,
            reconnect_backoff: Duration::from_millis(self.tuning.reconnect_backoff_ms),
        };

        let stream = SonioxTranslationStream::spawn(
            options.stream_id,
            options.subscription_key,
            &pair.target,
            params,
            options.events,
            self.health.clone(),
        );

        self.record_success();
        Ok(Box::new(stream))
    }

    fn health(&self) -> ProviderHealthStatus {
        self.health.status()
    }

    fn record_success(&self) {
        self.health.record_success();
    }

    fn record_failure(&self, reason: &str) {
        self.health.record_failure(reason);
    }

    async fn dispose(&self) {
        tracing::debug!("Disposed soniox provider");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speech_bridge_core::AUTO_SOURCE;

    fn provider() -> SonioxProvider {
        let config = SonioxConfig {
            api_key: "test-key".to_string(),
            ..Default::default()
        };
        SonioxProvider::new(config, StreamTuning::default())
    }

    #[tokio::test]
    async fn test_initialize_requires_api_key() {
        let keyless = SonioxProvider::new(SonioxConfig::default(), StreamTuning::default());
        assert!(matches!(
            keyless.initialize().await,
            Err(ProviderError::Initialization(_))
        ));

        assert!(provider().initialize().await.is_ok());
    }

    #[test]
    fn test_supports_language_pair() {
        let provider = provider();
        assert!(provider.supports_language_pair("es", "en"));
        assert!(provider.supports_language_pair("en-US", "fr"));
        assert!(!provider.supports_language_pair("en", "en"));
        assert!(!provider.supports_language_pair("xx", "en"));
    }

    #[test]
    fn test_supports_any_source() {
        let provider = provider();
        assert!(provider.supports_auto_detection());
        assert!(provider.supports_language_pair(AUTO_SOURCE, "en"));
    }

    #[tokio::test]
    async fn test_create_stream_rejects_unsupported_pair() {
        let provider = provider();
        let (events, _rx) = speech_bridge_core::stream_event_channel();
        let options = TranslationStreamOptions {
            stream_id: "s1".to_string(),
            subscription_key: "translation:en->en".to_string(),
            source_language: "en".to_string(),
            target_language: "en".to_string(),
            events,
        };

        match provider.create_translation_stream(options).await {
            Err(ProviderError::InvalidLanguagePair { source, target }) => {
                assert_eq!(source, "en");
                assert_eq!(target, "en");
            }
            other => panic!("expected InvalidLanguagePair, got {:?}", other.map(|_| ())),
        }
    }
}
