//! SDK-mediated continuous recognizer provider
//!
//! The vendor SDK manages the audio transport and emits partial/final
//! recognition events with per-language translation maps. One session
//! recognizes one fixed source locale; there is no auto-detection and no
//! two-way mode.

pub mod messages;
pub mod recognizer;
mod stream;

pub use recognizer::{ContinuousRecognizer, RecognizerConfig, RecognizerEvent};
pub use stream::AzureTranslationStream;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use speech_bridge_config::AzureConfig;
use speech_bridge_core::{
    expand_locale, normalize, LanguagePair, ProviderCapabilities, ProviderHealthStatus,
    TranslationStreamOptions,
};

use crate::health::ProviderHealthTracker;
use crate::provider::{TranslationProvider, TranslationStream};
use crate::ProviderError;

/// Source languages with a locale mapping for the recognizer.
const LANGUAGES: &[&str] = &[
    "ar", "de", "en", "es", "fr", "hi", "it", "ja", "ko", "nl", "pl", "pt", "ru", "tr", "zh",
];

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

    ProviderCapabilities {
        supported_language_pairs: pairs,
        supports_auto_detection: false,
        supports_multi_source: false,
        max_concurrent_streams,
        ..Default::default()
    }
}

/// Continuous-recognizer translation provider.
pub struct AzureProvider {
    config: AzureConfig,
    capabilities: ProviderCapabilities,
    health: Arc<ProviderHealthTracker>,
}

impl AzureProvider {
    pub fn new(config: AzureConfig) -> Self {
        let capabilities = build_capabilities(config.max_concurrent_streams);
        Self {
            config,
            capabilities,
            health: Arc::new(ProviderHealthTracker::new()),
        }
    }
}

#[async_trait]
impl TranslationProvider for AzureProvider {
    fn name(&self) -> &'static str {
        "azure"
    }

    async fn initialize(&self) -> Result<(), ProviderError> {
        if self.config.key.is_empty() {
            return Err(ProviderError::Initialization(
                "Missing azure subscription key".to_string(),
            ));
        }
        if self.config.region.is_empty() {
            return Err(ProviderError::Initialization(
                "Missing azure region".to_string(),
            ));
        }
        tracing::info!("Initialized azure provider (region {})", self.config.region);
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

        // The vendor wants full locales on the wire
        let recognizer_config = RecognizerConfig {
            key: self.config.key.clone(),
            region: self.config.region.clone(),
            source_locale: expand_locale(&pair.source).to_string(),
            target_languages: vec![pair.target.clone()],
        };

        tracing::info!("Creating azure stream {} ({})", options.stream_id, pair);

        let stream = AzureTranslationStream::spawn(
            options.stream_id,
            options.subscription_key,
            &pair.source,
            &pair.target,
            recognizer_config,
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
        tracing::debug!("Disposed azure provider");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speech_bridge_core::AUTO_SOURCE;

    fn provider() -> AzureProvider {
        AzureProvider::new(AzureConfig {
            key: "test-key".to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_initialize_requires_key() {
        let missing = AzureProvider::new(AzureConfig::default());
        assert!(matches!(
            missing.initialize().await,
            Err(ProviderError::Initialization(_))
        ));

        assert!(provider().initialize().await.is_ok());
    }

    #[test]
    fn test_no_auto_detection() {
        let provider = provider();
        assert!(!provider.supports_auto_detection());
        assert!(!provider.supports_language_pair(AUTO_SOURCE, "en"));
    }

    #[test]
    fn test_supports_language_pair() {
        let provider = provider();
        assert!(provider.supports_language_pair("es", "en"));
        assert!(provider.supports_language_pair("es-MX", "en-GB"));
        assert!(!provider.supports_language_pair("es", "es"));
    }
}
