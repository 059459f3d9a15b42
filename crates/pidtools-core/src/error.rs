//! # Error Types
//!
//! Errors raised while constructing core values. Network and lifecycle
//! failures live in the crates that own those concerns.

use thiserror::Error;

/// Errors from validating identifiers and parsing state vocabulary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The string is not a syntactically valid DOI.
    #[error("invalid DOI {value:?}: {reason}")]
    InvalidDoi {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The string does not name a DOI state.
    #[error("unknown DOI state: {0:?}")]
    UnknownState(String),

    /// The string does not name a state-transition event.
    #[error("unknown DOI state event: {0:?} (expected register, publish or hide)")]
    UnknownEvent(String),

    /// Candidate metadata could not be rendered as an attribute mapping.
    #[error("cannot render candidate metadata: {0}")]
    Metadata(String),
}
