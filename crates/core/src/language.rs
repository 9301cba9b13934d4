//! Language code normalization and locale expansion
//!
//! Providers disagree about code granularity: the recognizer SDK wants full
//! locales ("es-ES"), the token-stream protocol wants base codes ("es"), and
//! subscriptions may arrive as either. Everything inside the bridge runs on
//! normalized base codes; expansion back to a locale happens only at the
//! vendor boundary.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Sentinel source code meaning "any language" (auto-detection).
pub const AUTO_SOURCE: &str = "all";

/// Normalize a BCP-47-ish code to its lowercase base (primary) subtag.
///
/// `"en-US"`, `"en_US"`, and `"EN"` all normalize to `"en"`. The
/// [`AUTO_SOURCE`] sentinel passes through unchanged. Idempotent.
pub fn normalize(code: &str) -> String {
    let code = code.trim();
    let base = code
        .split(['-', '_'])
        .next()
        .unwrap_or(code);
    base.to_ascii_lowercase()
}

/// Expand a normalized base code to the full locale the recognizer SDK
/// expects. Unknown codes pass through unchanged.
pub fn expand_locale(base: &str) -> &str {
    match base {
        "ar" => "ar-SA",
        "de" => "de-DE",
        "en" => "en-US",
        "es" => "es-ES",
        "fr" => "fr-FR",
        "hi" => "hi-IN",
        "it" => "it-IT",
        "ja" => "ja-JP",
        "ko" => "ko-KR",
        "nl" => "nl-NL",
        "pl" => "pl-PL",
        "pt" => "pt-BR",
        "ru" => "ru-RU",
        "tr" => "tr-TR",
        "zh" => "zh-CN",
        other => other,
    }
}

/// A source/target language pair in normalized base codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    /// Create a pair, normalizing both codes. Rejects equal codes.
    pub fn new(source: &str, target: &str) -> Result<Self, CoreError> {
        let source = normalize(source);
        let target = normalize(target);

        if source.is_empty() || target.is_empty() {
            return Err(CoreError::EmptyLanguageCode);
        }
        if source == target {
            return Err(CoreError::InvalidLanguagePair { source, target });
        }

        Ok(Self { source, target })
    }

    /// True when the source is the any-language sentinel.
    pub fn is_auto_source(&self) -> bool {
        self.source == AUTO_SOURCE
    }
}

impl std::fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_region() {
        assert_eq!(normalize("en-US"), "en");
        assert_eq!(normalize("en_US"), "en");
        assert_eq!(normalize("ES"), "es");
        assert_eq!(normalize("zh-Hans-CN"), "zh");
    }

    #[test]
    fn test_normalize_idempotent() {
        for code in ["en-US", "fr", "ALL", "pt_BR", "zh-Hans"] {
            let once = normalize(code);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_auto_source_passthrough() {
        assert_eq!(normalize(AUTO_SOURCE), AUTO_SOURCE);
    }

    #[test]
    fn test_expand_locale() {
        assert_eq!(expand_locale("es"), "es-ES");
        assert_eq!(expand_locale("en"), "en-US");
        // Unknown codes pass through
        assert_eq!(expand_locale("xx"), "xx");
    }

    #[test]
    fn test_pair_rejects_equal_codes() {
        assert!(LanguagePair::new("en", "en").is_err());
        // Equal after normalization is still equal
        assert!(LanguagePair::new("en-US", "en-GB").is_err());
    }

    #[test]
    fn test_pair_normalizes() {
        let pair = LanguagePair::new("en-US", "es-MX").unwrap();
        assert_eq!(pair.source, "en");
        assert_eq!(pair.target, "es");
        assert_eq!(pair.to_string(), "en->es");
    }
}
