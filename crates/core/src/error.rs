//! Core error types

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    InvalidLanguagePair { source: String, target: String },

    EmptyLanguageCode,
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidLanguagePair { source, target } => {
                write!(f, "Invalid language pair: {source} -> {target}")
            }
            CoreError::EmptyLanguageCode => write!(f, "Empty language code"),
        }
    }
}

impl std::error::Error for CoreError {}
