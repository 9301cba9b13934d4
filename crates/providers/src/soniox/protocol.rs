//! Token-stream wire protocol
//!
//! The upstream expects exactly one JSON configuration message on connect,
//! then binary audio frames; it answers with JSON messages carrying either a
//! `tokens` array or an error indication. Exact field names live here, at
//! the protocol boundary, not in the assembly logic.

use serde::{Deserialize, Serialize};

use speech_bridge_core::{
    normalize, ProviderCapabilities, Token, TokenStatus, AUTO_SOURCE,
};

/// The three upstream translation modes, resolved once from the requested
/// language pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationDirective {
    /// Fixed source and target on one connection
    OneWay { source: String, target: String },
    /// Bidirectional detection between two languages on one connection;
    /// only valid for pairs the two-way table confirms
    TwoWay { a: String, b: String },
    /// Any-language source, fixed target
    AnySource { target: String },
}

impl TranslationDirective {
    /// Resolve the upstream mode for a requested pair.
    ///
    /// The any-source sentinel always selects `AnySource`; a pair the
    /// two-way table confirms selects `TwoWay`; everything else is a plain
    /// one-way connection.
    pub fn resolve(caps: &ProviderCapabilities, source: &str, target: &str) -> Self {
        let source = normalize(source);
        let target = normalize(target);

        if source == AUTO_SOURCE {
            Self::AnySource { target }
        } else if caps.is_two_way_pair(&source, &target) {
            Self::TwoWay {
                a: source,
                b: target,
            }
        } else {
            Self::OneWay { source, target }
        }
    }

    /// Language hints to send alongside the translation object.
    pub fn language_hints(&self) -> Vec<String> {
        match self {
            Self::OneWay { source, .. } => vec![source.clone()],
            Self::TwoWay { a, b } => vec![a.clone(), b.clone()],
            Self::AnySource { .. } => Vec::new(),
        }
    }

    /// Whether the upstream should run language identification.
    pub fn needs_language_identification(&self) -> bool {
        !matches!(self, Self::OneWay { .. })
    }

    fn to_wire(&self) -> TranslationObject {
        match self {
            Self::OneWay { source, target } => TranslationObject {
                kind: "one_way",
                source_language: Some(source.clone()),
                target_language: Some(target.clone()),
                language_a: None,
                language_b: None,
            },
            Self::TwoWay { a, b } => TranslationObject {
                kind: "two_way",
                source_language: None,
                target_language: None,
                language_a: Some(a.clone()),
                language_b: Some(b.clone()),
            },
            Self::AnySource { target } => TranslationObject {
                kind: "one_way",
                source_language: None,
                target_language: Some(target.clone()),
                language_a: None,
                language_b: None,
            },
        }
    }
}

/// Translation section of the configuration message.
#[derive(Debug, Serialize)]
pub struct TranslationObject {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language_a: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language_b: Option<String>,
}

/// The single configuration message sent before any audio.
#[derive(Debug, Serialize)]
pub struct ConfigMessage {
    pub api_key: String,
    pub model: String,
    pub audio_format: &'static str,
    pub sample_rate: u32,
    pub num_channels: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub language_hints: Vec<String>,
    pub enable_language_identification: bool,
    pub enable_endpoint_detection: bool,
    /// Final-only token delivery; partial tokens are never requested
    pub enable_non_final_tokens: bool,
    pub translation: TranslationObject,
}

impl ConfigMessage {
    pub fn new(
        api_key: &str,
        model: &str,
        directive: &TranslationDirective,
    ) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            audio_format: "pcm_s16le",
            sample_rate: speech_bridge_core::SAMPLE_RATE,
            num_channels: 1,
            language_hints: directive.language_hints(),
            enable_language_identification: directive.needs_language_identification(),
            enable_endpoint_detection: true,
            enable_non_final_tokens: false,
            translation: directive.to_wire(),
        }
    }
}

/// One token as delivered on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WireToken {
    pub text: String,
    pub start_ms: Option<f64>,
    pub end_ms: Option<f64>,
    pub confidence: Option<f32>,
    pub is_final: bool,
    pub language: Option<String>,
    pub source_language: Option<String>,
    pub translation_status: Option<String>,
}

impl WireToken {
    /// Normalize into the bridge token shape. Returns `None` for tokens with
    /// no usable language attribution.
    pub fn into_token(self) -> Option<Token> {
        let language = normalize(self.language.as_deref()?);
        let status = match self.translation_status.as_deref() {
            Some("translation") => TokenStatus::Translation,
            // "original", "none", or absent all mean recognized speech
            _ => TokenStatus::Original,
        };
        let start_ms = self.start_ms.unwrap_or(0.0).max(0.0) as u64;
        let end_ms = self.end_ms.unwrap_or(start_ms as f64).max(start_ms as f64) as u64;

        Some(Token {
            text: self.text,
            start_ms,
            duration_ms: end_ms - start_ms,
            is_final: self.is_final,
            status,
            language,
            source_language: self.source_language.as_deref().map(normalize),
            confidence: self.confidence,
        })
    }
}

/// Convert a wire batch into bridge tokens.
///
/// The end-of-utterance sentinel often arrives without language attribution
/// and must survive conversion; other unattributed tokens are dropped.
pub fn convert_tokens(tokens: Vec<WireToken>, end_token: &str) -> Vec<Token> {
    tokens
        .into_iter()
        .filter_map(|wire| {
            if wire.text == end_token {
                let start_ms = wire.start_ms.unwrap_or(0.0).max(0.0) as u64;
                Some(Token {
                    text: wire.text,
                    start_ms,
                    duration_ms: 0,
                    is_final: true,
                    status: TokenStatus::Original,
                    language: wire.language.as_deref().map(normalize).unwrap_or_default(),
                    source_language: None,
                    confidence: None,
                })
            } else {
                wire.into_token()
            }
        })
        .collect()
}

/// One upstream response message: tokens or an error indication.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResponseMessage {
    pub tokens: Vec<WireToken>,
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
    pub finished: Option<bool>,
}

impl ResponseMessage {
    pub fn is_error(&self) -> bool {
        self.error_code.is_some() || self.error_message.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn caps() -> ProviderCapabilities {
        let mut caps = ProviderCapabilities {
            supported_language_pairs: BTreeMap::from([
                ("en".to_string(), vec!["es".to_string(), "fr".to_string()]),
                ("es".to_string(), vec!["en".to_string()]),
                ("fr".to_string(), vec!["en".to_string()]),
            ]),
            supports_auto_detection: true,
            ..Default::default()
        };
        caps.add_two_way_pair("en", "es");
        caps
    }

    #[test]
    fn test_directive_one_way() {
        let directive = TranslationDirective::resolve(&caps(), "fr", "en");
        assert_eq!(
            directive,
            TranslationDirective::OneWay {
                source: "fr".to_string(),
                target: "en".to_string()
            }
        );
        assert_eq!(directive.language_hints(), vec!["fr"]);
        assert!(!directive.needs_language_identification());
    }

    #[test]
    fn test_directive_two_way_requires_table_entry() {
        let directive = TranslationDirective::resolve(&caps(), "es", "en");
        assert!(matches!(directive, TranslationDirective::TwoWay { .. }));

        // fr<->en is not in the two-way table
        let directive = TranslationDirective::resolve(&caps(), "en", "fr");
        assert!(matches!(directive, TranslationDirective::OneWay { .. }));
    }

    #[test]
    fn test_directive_any_source() {
        let directive = TranslationDirective::resolve(&caps(), AUTO_SOURCE, "en");
        assert_eq!(
            directive,
            TranslationDirective::AnySource {
                target: "en".to_string()
            }
        );
        assert!(directive.language_hints().is_empty());
        assert!(directive.needs_language_identification());
    }

    #[test]
    fn test_config_message_shape() {
        let directive = TranslationDirective::resolve(&caps(), "es", "en");
        let config = ConfigMessage::new("key", "model-rt", &directive);
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["audio_format"], "pcm_s16le");
        assert_eq!(json["sample_rate"], 16000);
        assert_eq!(json["translation"]["type"], "two_way");
        assert_eq!(json["translation"]["language_a"], "es");
        assert_eq!(json["translation"]["language_b"], "en");
        assert!(json["translation"].get("target_language").is_none());
        assert_eq!(json["enable_non_final_tokens"], false);
    }

    #[test]
    fn test_any_source_config_has_target_only() {
        let directive = TranslationDirective::resolve(&caps(), "all", "en");
        let config = ConfigMessage::new("key", "model-rt", &directive);
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["translation"]["type"], "one_way");
        assert_eq!(json["translation"]["target_language"], "en");
        assert!(json["translation"].get("source_language").is_none());
        assert!(json.get("language_hints").is_none());
    }

    #[test]
    fn test_wire_token_conversion() {
        let wire = WireToken {
            text: "Hello".to_string(),
            start_ms: Some(100.0),
            end_ms: Some(350.0),
            confidence: Some(0.92),
            is_final: true,
            language: Some("en-US".to_string()),
            source_language: Some("es".to_string()),
            translation_status: Some("translation".to_string()),
        };

        let token = wire.into_token().unwrap();
        assert_eq!(token.language, "en");
        assert_eq!(token.status, TokenStatus::Translation);
        assert_eq!(token.start_ms, 100);
        assert_eq!(token.duration_ms, 250);
        assert_eq!(token.group_language(), "es");
    }

    #[test]
    fn test_wire_token_without_language_is_dropped() {
        let wire = WireToken {
            text: "x".to_string(),
            ..Default::default()
        };
        assert!(wire.into_token().is_none());
    }

    #[test]
    fn test_end_sentinel_survives_conversion() {
        let wire = vec![
            WireToken {
                text: "<end>".to_string(),
                is_final: true,
                ..Default::default()
            },
            WireToken {
                text: "orphan".to_string(),
                is_final: true,
                ..Default::default()
            },
        ];

        let tokens = convert_tokens(wire, "<end>");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "<end>");
        assert!(tokens[0].is_final);
    }

    #[test]
    fn test_response_error_detection() {
        let msg: ResponseMessage =
            serde_json::from_str(r#"{"error_code": 401, "error_message": "bad key"}"#).unwrap();
        assert!(msg.is_error());
        assert!(msg.tokens.is_empty());

        let msg: ResponseMessage = serde_json::from_str(r#"{"tokens": []}"#).unwrap();
        assert!(!msg.is_error());
    }
}
