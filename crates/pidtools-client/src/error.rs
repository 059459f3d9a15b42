//! Repository client error types.
//!
//! Every failure carries the DOI it concerns (empty for `create`, where the
//! service has not assigned one yet) and an HTTP-style code, so the
//! lifecycle layer can report `{message, http_code}` without inspecting
//! the variant.

use std::fmt;

use crate::config::ConfigError;

/// The remote operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    Get,
    Create,
    Update,
    Delete,
}

impl RepositoryOperation {
    /// Lowercase operation name for logs and events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    fn failure_prefix(&self) -> &'static str {
        match self {
            Self::Get => "Unable to fetch DOI metadata",
            Self::Create => "Error creating DOI",
            Self::Update => "Error updating DOI",
            Self::Delete => "Error deleting DOI",
        }
    }
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from registration service calls.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The service answered 401. Checked before any status handling.
    #[error("Authentication error [401]")]
    Authentication {
        operation: RepositoryOperation,
        doi: String,
    },

    /// DNS, connect or timeout failure; no response was received.
    #[error("{}", transport_message(.operation, .source))]
    Transport {
        operation: RepositoryOperation,
        doi: String,
        source: reqwest::Error,
    },

    /// The service answered with a status other than the operation's
    /// expected success code.
    #[error("{}", status_message(.operation, .status, .body))]
    UnexpectedStatus {
        operation: RepositoryOperation,
        doi: String,
        status: u16,
        body: String,
    },

    /// The response body was empty or not a DOI document.
    #[error("Unable to decode DOI metadata.")]
    Decode {
        operation: RepositoryOperation,
        doi: String,
        detail: String,
    },

    /// The client could not be constructed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

fn transport_message(operation: &RepositoryOperation, source: &reqwest::Error) -> String {
    match operation {
        RepositoryOperation::Get => format!(
            "{}: {source}. Please check the URL is correct.",
            operation.failure_prefix()
        ),
        _ => format!("{}: {source}", operation.failure_prefix()),
    }
}

fn status_message(operation: &RepositoryOperation, status: &u16, body: &str) -> String {
    match operation {
        RepositoryOperation::Get => format!("{}: [{status}] {body}.", operation.failure_prefix()),
        _ => format!("{} [{status}]: {body}", operation.failure_prefix()),
    }
}

impl RepositoryError {
    /// HTTP-style code reported to callers.
    pub fn http_code(&self) -> u16 {
        match self {
            Self::Authentication { .. } => 401,
            Self::Transport { .. } => 500,
            Self::UnexpectedStatus { status, .. } => *status,
            Self::Decode { .. } => 400,
            Self::Config(_) => 500,
        }
    }

    /// The DOI the failed call concerned; empty for `create`.
    pub fn doi(&self) -> &str {
        match self {
            Self::Authentication { doi, .. }
            | Self::Transport { doi, .. }
            | Self::UnexpectedStatus { doi, .. }
            | Self::Decode { doi, .. } => doi,
            Self::Config(_) => "",
        }
    }

    /// The operation that failed, when a call was attempted.
    pub fn operation(&self) -> Option<RepositoryOperation> {
        match self {
            Self::Authentication { operation, .. }
            | Self::Transport { operation, .. }
            | Self::UnexpectedStatus { operation, .. }
            | Self::Decode { operation, .. } => Some(*operation),
            Self::Config(_) => None,
        }
    }

    /// Whether the service rejected the credentials.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}
