//! Health-aware provider registry
//!
//! Providers are kept in preference order. Selection returns the first
//! healthy provider supporting the requested pair, falling back to any
//! supporting provider when all of them are unhealthy (a degraded provider
//! still beats refusing the subscription outright).

use std::sync::Arc;

use crate::provider::TranslationProvider;
use crate::ProviderError;

/// Ordered collection of translation providers.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn TranslationProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Append a provider at the lowest preference position.
    pub fn register(&mut self, provider: Arc<dyn TranslationProvider>) {
        tracing::info!("Registered provider '{}'", provider.name());
        self.providers.push(provider);
    }

    /// All registered providers in preference order.
    pub fn providers(&self) -> &[Arc<dyn TranslationProvider>] {
        &self.providers
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn TranslationProvider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    /// Pick the provider to open a stream on for `source -> target`.
    pub fn select(
        &self,
        source: &str,
        target: &str,
    ) -> Result<Arc<dyn TranslationProvider>, ProviderError> {
        let supporting: Vec<&Arc<dyn TranslationProvider>> = self
            .providers
            .iter()
            .filter(|p| p.supports_language_pair(source, target))
            .collect();

        if let Some(provider) = supporting.iter().find(|p| p.health().is_healthy) {
            return Ok(Arc::clone(provider));
        }

        // Every supporting provider is unhealthy; degrade to the most
        // preferred one instead of failing the subscription.
        if let Some(provider) = supporting.first() {
            tracing::warn!(
                "All providers for {} -> {} are unhealthy, using '{}' anyway",
                source,
                target,
                provider.name()
            );
            return Ok(Arc::clone(provider));
        }

        Err(ProviderError::InvalidLanguagePair {
            source: source.to_string(),
            target: target.to_string(),
        })
    }

    /// Dispose every provider.
    pub async fn dispose(&self) {
        for provider in &self.providers {
            provider.dispose().await;
        }
    }
}
