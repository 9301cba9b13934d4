//! Subscription strings
//!
//! Two shapes arrive from the session layer: `transcription:<lang>` and
//! `translation:<source>-><target>`, optionally carrying an opaque
//! `?suffix` that is stripped before parsing. Codes are normalized on
//! parse, so equal subscriptions compare equal regardless of how the caller
//! spelled the locale.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use speech_bridge_core::{normalize, AUTO_SOURCE};

use crate::RoutingError;

/// A downstream consumer's request for transcription or translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subscription {
    /// Plain transcription of one language
    Transcription { language: String },
    /// Translation from one language (or [`AUTO_SOURCE`]) to another
    Translation { source: String, target: String },
}

impl Subscription {
    /// Parse a subscription string, stripping any opaque `?suffix`.
    pub fn parse(raw: &str) -> Result<Self, RoutingError> {
        let stripped = raw.split('?').next().unwrap_or(raw).trim();

        if let Some(language) = stripped.strip_prefix("transcription:") {
            let language = normalize(language);
            if language.is_empty() {
                return Err(RoutingError::InvalidSubscription(raw.to_string()));
            }
            return Ok(Self::Transcription { language });
        }

        if let Some(pair) = stripped.strip_prefix("translation:") {
            let Some((source, target)) = pair.split_once("->") else {
                return Err(RoutingError::InvalidSubscription(raw.to_string()));
            };
            let source = normalize(source);
            let target = normalize(target);
            if source.is_empty() || target.is_empty() || source == target {
                return Err(RoutingError::InvalidSubscription(raw.to_string()));
            }
            return Ok(Self::Translation { source, target });
        }

        Err(RoutingError::InvalidSubscription(raw.to_string()))
    }

    /// The language whose transcription this subscription implies, when it
    /// names a concrete one. Any-source translation implies no single
    /// language.
    pub fn transcription_language(&self) -> Option<&str> {
        match self {
            Self::Transcription { language } => Some(language),
            Self::Translation { source, .. } if source != AUTO_SOURCE => Some(source),
            Self::Translation { .. } => None,
        }
    }
}

impl std::fmt::Display for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transcription { language } => write!(f, "transcription:{}", language),
            Self::Translation { source, target } => {
                write!(f, "translation:{}->{}", source, target)
            }
        }
    }
}

impl FromStr for Subscription {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
