//! Normalized provider tokens
//!
//! Token-stream providers deliver recognition output as small timed units
//! tagged as original speech or translation. A single connection may
//! interleave multiple languages and directions, so every token carries its
//! own language attribution.

use serde::{Deserialize, Serialize};

/// Whether a token is original recognized speech or translated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    Original,
    Translation,
}

/// The smallest unit of recognized text from an upstream provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Token text
    pub text: String,
    /// Start offset in ms from stream start
    pub start_ms: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Final tokens never change; non-final tokens may be revised
    pub is_final: bool,
    /// Original speech or translation output
    pub status: TokenStatus,
    /// Language of this token's text
    pub language: String,
    /// For translation tokens, the language the speech was recognized in
    pub source_language: Option<String>,
    /// Recognition confidence (0.0 - 1.0), when the provider reports one
    pub confidence: Option<f32>,
}

impl Token {
    /// End offset in ms from stream start.
    pub fn end_ms(&self) -> u64 {
        self.start_ms + self.duration_ms
    }

    /// The source language this token should be grouped under: translation
    /// tokens group under the language they were translated from, original
    /// tokens under their own language.
    pub fn group_language(&self) -> &str {
        match self.status {
            TokenStatus::Translation => self.source_language.as_deref().unwrap_or(&self.language),
            TokenStatus::Original => &self.language,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(status: TokenStatus, language: &str, source: Option<&str>) -> Token {
        Token {
            text: "hola".to_string(),
            start_ms: 100,
            duration_ms: 250,
            is_final: true,
            status,
            language: language.to_string(),
            source_language: source.map(str::to_string),
            confidence: Some(0.9),
        }
    }

    #[test]
    fn test_group_language() {
        let original = token(TokenStatus::Original, "es", None);
        assert_eq!(original.group_language(), "es");

        let translation = token(TokenStatus::Translation, "en", Some("es"));
        assert_eq!(translation.group_language(), "es");

        // Translation without source attribution falls back to its own language
        let unattributed = token(TokenStatus::Translation, "en", None);
        assert_eq!(unattributed.group_language(), "en");
    }

    #[test]
    fn test_end_ms() {
        let t = token(TokenStatus::Original, "es", None);
        assert_eq!(t.end_ms(), 350);
    }
}
