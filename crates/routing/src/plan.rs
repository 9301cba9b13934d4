//! Stream plans
//!
//! The optimizer's output: which upstream connections to open, which
//! subscriptions each one serves, and who owns each language's
//! transcription output.

use serde::{Deserialize, Serialize};

use crate::Subscription;

/// How a plan was consolidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// A dedicated transcription connection for one language
    TranscriptionOnly,
    /// Two opposite-direction subscriptions merged onto one connection
    TwoWay,
    /// All English-targeted subscriptions merged onto one any-source
    /// connection
    UniversalEnglish,
    /// Several sources merged toward one target
    MultiSource,
    /// A subscription that could not be consolidated
    Individual,
}

/// Upstream connection configuration, resolved once per plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanConfig {
    /// Transcription only, no translation
    Transcription { language: String },
    /// Fixed source and target
    OneWay { source: String, target: String },
    /// Bidirectional detection between two languages
    TwoWay { a: String, b: String },
    /// Any-language source, fixed target
    AnySource { target: String },
    /// Multiple simultaneous sources, one target
    MultiSource {
        sources: Vec<String>,
        target: String,
    },
}

impl PlanConfig {
    /// The source-language hint(s) for this connection. Empty means
    /// any-language.
    pub fn source_languages(&self) -> Vec<&str> {
        match self {
            Self::Transcription { language } => vec![language.as_str()],
            Self::OneWay { source, .. } => vec![source.as_str()],
            Self::TwoWay { a, b } => vec![a.as_str(), b.as_str()],
            Self::AnySource { .. } => Vec::new(),
            Self::MultiSource { sources, .. } => sources.iter().map(String::as_str).collect(),
        }
    }

    /// The translation target, when the connection translates at all.
    pub fn target_language(&self) -> Option<&str> {
        match self {
            Self::Transcription { .. } => None,
            Self::OneWay { target, .. }
            | Self::AnySource { target }
            | Self::MultiSource { target, .. } => Some(target.as_str()),
            // A two-way connection targets whichever side was not spoken
            Self::TwoWay { .. } => None,
        }
    }
}

/// One planned upstream connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamPlan {
    pub kind: PlanKind,
    pub config: PlanConfig,
    /// The subscriptions this plan serves; across all plans for one input
    /// set, every subscription appears exactly once
    pub handled_subscriptions: Vec<Subscription>,
    /// Languages whose transcription output this plan forwards; each
    /// language is owned by exactly one plan
    pub owns_transcription: Vec<String>,
    /// Languages this plan touches but must not forward transcription for,
    /// because another plan owns them
    pub skip_transcription_for: Vec<String>,
}

impl StreamPlan {
    /// Canonical key for logs and stream correlation.
    pub fn subscription_key(&self) -> String {
        self.handled_subscriptions
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Whether this plan forwards transcription for `language`.
    pub fn owns(&self, language: &str) -> bool {
        self.owns_transcription.iter().any(|l| l == language)
    }
}
