//! # Lifecycle Error Types
//!
//! [`LifecycleError`] unifies repository, assembly and local-store failures.
//! It never escapes a manager operation: every failure is converted into an
//! [`OperationFailure`] after the error events have been emitted.

use std::path::PathBuf;

use pidtools_client::RepositoryError;
use pidtools_core::{ContentItemId, CoreError, Doi};
use serde::Serialize;
use thiserror::Error;

use crate::events::Operation;

/// Failures reading or writing local association and version-link records.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cannot access store file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("store file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Failures building candidate metadata.
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("content item {0} not found")]
    UnknownItem(ContentItemId),

    #[error("cannot read related DOIs: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] CoreError),
}

/// Any failure inside a lifecycle operation.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error("local association store failed: {0}")]
    Store(#[from] StoreError),

    /// The remote call succeeded but the local record could not be written.
    /// Local and remote state now disagree until the operation is repeated.
    #[error("{operation} of DOI {doi} succeeded remotely but the local association was not saved: {source}")]
    Desynchronized {
        operation: Operation,
        doi: Doi,
        source: StoreError,
    },

    #[error("content item {item} already has DOI {doi}")]
    AlreadyAssociated { item: ContentItemId, doi: Doi },

    #[error("content item {0} has no DOI")]
    NotAssociated(ContentItemId),

    #[error("content item {0} cannot be marked as replaced by itself")]
    SelfReplacement(ContentItemId),
}

impl LifecycleError {
    /// HTTP-style code for the failure. Non-HTTP failures report 500.
    pub fn http_code(&self) -> u16 {
        match self {
            Self::Repository(e) => e.http_code(),
            Self::AlreadyAssociated { .. } => 409,
            Self::NotAssociated(_) => 404,
            Self::SelfReplacement(_) => 400,
            Self::Assembly(_) | Self::Store(_) | Self::Desynchronized { .. } => 500,
        }
    }
}

/// User-facing failure outcome of a lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationFailure {
    pub message: String,
    pub http_code: u16,
}

impl std::fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.message, self.http_code)
    }
}

impl std::error::Error for OperationFailure {}

impl From<&LifecycleError> for OperationFailure {
    fn from(error: &LifecycleError) -> Self {
        Self {
            message: error.to_string(),
            http_code: error.http_code(),
        }
    }
}

impl From<LifecycleError> for OperationFailure {
    fn from(error: LifecycleError) -> Self {
        Self::from(&error)
    }
}
