//! Errors raised while reading schema documents and walking class graphs.

use thiserror::Error;

/// ParseError reports a malformed scalar or document.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("invalid version string '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("invalid item reference '{0}'")]
    InvalidItemRef(String),

    #[error("invalid multiplicity '{0}', expected (lower..upper)")]
    InvalidMultiplicity(String),

    #[error("invalid presentation format '{0}'")]
    InvalidPresentationFormat(String),

    #[error("failed to parse schema document: {0}")]
    Document(String),
}

impl ParseError {
    /// Creates an invalid version error.
    pub fn invalid_version(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::InvalidVersion {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_yaml::Error> for ParseError {
    fn from(err: serde_yaml::Error) -> Self {
        ParseError::Document(err.to_string())
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::Document(err.to_string())
    }
}

/// GraphError reports a structurally malformed class graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("class {0} derives from itself through its base classes")]
    Cycle(String),
}
