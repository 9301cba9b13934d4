//! Provider capability and health types
//!
//! Capabilities are data, not behavior: providers publish static tables and
//! everything that needs a capability decision (pair validation, the
//! subscription optimizer) reads them directly.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::language::{normalize, AUTO_SOURCE};

/// Static capability tables published by a provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderCapabilities {
    /// source -> supported targets, all normalized base codes
    pub supported_language_pairs: BTreeMap<String, Vec<String>>,
    /// Pairs supporting bidirectional detection on one connection, stored
    /// with lexicographically ordered keys
    pub two_way_pairs: BTreeSet<(String, String)>,
    /// Whether the any-language source sentinel is supported
    pub supports_auto_detection: bool,
    /// Whether one connection can merge multiple sources into one target
    pub supports_multi_source: bool,
    /// Upper bound on concurrently open streams
    pub max_concurrent_streams: usize,
}

impl ProviderCapabilities {
    /// Whether the provider can translate `source` into `target`.
    ///
    /// Both codes are normalized first; equal codes are never supported. The
    /// [`AUTO_SOURCE`] sentinel is supported only by auto-detecting
    /// providers, for any target some source can reach.
    pub fn supports_pair(&self, source: &str, target: &str) -> bool {
        let source = normalize(source);
        let target = normalize(target);
        if source == target {
            return false;
        }
        if source == AUTO_SOURCE {
            return self.supports_auto_detection
                && self
                    .supported_language_pairs
                    .values()
                    .any(|targets| targets.iter().any(|t| *t == target));
        }
        self.supported_language_pairs
            .get(&source)
            .is_some_and(|targets| targets.iter().any(|t| *t == target))
    }

    /// Symmetric two-way lookup: `is_two_way_pair(a, b) == is_two_way_pair(b, a)`.
    pub fn is_two_way_pair(&self, a: &str, b: &str) -> bool {
        let a = normalize(a);
        let b = normalize(b);
        if a == b {
            return false;
        }
        let key = if a <= b { (a, b) } else { (b, a) };
        self.two_way_pairs.contains(&key)
    }

    /// Record a two-way pair (order-insensitive).
    pub fn add_two_way_pair(&mut self, a: &str, b: &str) {
        let a = normalize(a);
        let b = normalize(b);
        let key = if a <= b { (a, b) } else { (b, a) };
        self.two_way_pairs.insert(key);
    }
}

/// Mutable health snapshot for one provider.
#[derive(Debug, Clone)]
pub struct ProviderHealthStatus {
    /// False after 3 consecutive failures, true again on any success
    pub is_healthy: bool,
    /// Consecutive failure count
    pub failures: u32,
    /// When the most recent failure happened
    pub last_failure: Option<Instant>,
    /// Human-readable reason for the most recent failure
    pub reason: Option<String>,
}

impl Default for ProviderHealthStatus {
    fn default() -> Self {
        Self {
            is_healthy: true,
            failures: 0,
            last_failure: None,
            reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> ProviderCapabilities {
        let mut caps = ProviderCapabilities {
            supported_language_pairs: BTreeMap::from([
                ("en".to_string(), vec!["es".to_string(), "fr".to_string()]),
                ("es".to_string(), vec!["en".to_string()]),
            ]),
            ..Default::default()
        };
        caps.add_two_way_pair("es", "en");
        caps
    }

    #[test]
    fn test_supports_pair_normalizes() {
        let caps = caps();
        assert!(caps.supports_pair("en-US", "es-MX"));
        assert!(!caps.supports_pair("fr", "en"));
    }

    #[test]
    fn test_equal_codes_never_supported() {
        let caps = caps();
        assert!(!caps.supports_pair("en", "en"));
        assert!(!caps.supports_pair("en-US", "en-GB"));
    }

    #[test]
    fn test_auto_source_requires_auto_detection() {
        let mut caps = caps();
        assert!(!caps.supports_pair(AUTO_SOURCE, "es"));

        caps.supports_auto_detection = true;
        assert!(caps.supports_pair(AUTO_SOURCE, "es"));
        // No source reaches "de"
        assert!(!caps.supports_pair(AUTO_SOURCE, "de"));
    }

    #[test]
    fn test_two_way_symmetric() {
        let caps = caps();
        assert!(caps.is_two_way_pair("en", "es"));
        assert!(caps.is_two_way_pair("es", "en"));
        assert_eq!(
            caps.is_two_way_pair("en", "fr"),
            caps.is_two_way_pair("fr", "en")
        );
    }
}
