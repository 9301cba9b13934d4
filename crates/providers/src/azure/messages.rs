//! Vendor wire messages for the continuous recognizer
//!
//! The recognizer service frames events as JSON with a `path` discriminator
//! and PascalCase fields; timing is in 100ns ticks. Everything here converts
//! at the boundary into [`RecognitionResult`], the shape the rest of the
//! stream works with.

use std::collections::HashMap;

use serde::Deserialize;

/// 100ns ticks per millisecond.
const TICKS_PER_MS: u64 = 10_000;

/// One event from the recognizer service.
#[derive(Debug, Deserialize)]
#[serde(tag = "path")]
pub enum VendorMessage {
    #[serde(rename = "turn.start")]
    TurnStart,
    #[serde(rename = "translation.hypothesis")]
    Hypothesis(TranslationHypothesis),
    #[serde(rename = "translation.phrase")]
    Phrase(TranslationPhrase),
    #[serde(rename = "turn.end")]
    TurnEnd,
}

/// Partial recognition with in-progress translations.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranslationHypothesis {
    pub text: String,
    #[serde(default)]
    pub translation: TranslationPayload,
    /// Start offset in ticks
    pub offset: u64,
    /// Duration in ticks
    pub duration: u64,
}

/// Final recognition for one phrase.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranslationPhrase {
    pub recognition_status: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub translation: TranslationPayload,
    pub offset: u64,
    pub duration: u64,
    #[serde(default)]
    pub primary_language: Option<PrimaryLanguage>,
}

impl TranslationPhrase {
    pub fn is_success(&self) -> bool {
        self.recognition_status == "Success"
    }
}

/// Per-language translation map as delivered by the vendor.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranslationPayload {
    #[serde(default)]
    pub translations: Vec<TranslationEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranslationEntry {
    pub language: String,
    pub display: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrimaryLanguage {
    pub language: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Vendor event translated out of wire framing.
#[derive(Debug, Clone)]
pub struct RecognitionResult {
    pub text: String,
    /// target language -> translated text
    pub translations: HashMap<String, String>,
    pub offset_ms: u64,
    pub duration_ms: u64,
    pub confidence: Option<f32>,
}

impl From<TranslationHypothesis> for RecognitionResult {
    fn from(h: TranslationHypothesis) -> Self {
        Self {
            text: h.text,
            translations: payload_map(h.translation),
            offset_ms: h.offset / TICKS_PER_MS,
            duration_ms: h.duration / TICKS_PER_MS,
            confidence: None,
        }
    }
}

impl From<TranslationPhrase> for RecognitionResult {
    fn from(p: TranslationPhrase) -> Self {
        let confidence = p.primary_language.as_ref().and_then(|l| l.confidence);
        Self {
            text: p.text,
            translations: payload_map(p.translation),
            offset_ms: p.offset / TICKS_PER_MS,
            duration_ms: p.duration / TICKS_PER_MS,
            confidence,
        }
    }
}

fn payload_map(payload: TranslationPayload) -> HashMap<String, String> {
    payload
        .translations
        .into_iter()
        .map(|entry| (entry.language, entry.display))
        .collect()
}
