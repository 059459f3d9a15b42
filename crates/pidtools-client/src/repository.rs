//! The repository seam between the lifecycle manager and the registration
//! service.
//!
//! [`DataCiteClient`](crate::DataCiteClient) is the production
//! implementation. Tests substitute in-memory doubles that simulate the
//! remote state machine.

use async_trait::async_trait;
use pidtools_core::Doi;

use crate::error::RepositoryError;
use crate::types::{DoiDocument, DoiRecord};

/// Remote DOI record operations. One call per invocation, no retries.
#[async_trait]
pub trait DoiRepository: Send + Sync {
    /// Fetch a record. HTTP 410 with a tombstone body is a success.
    async fn get(&self, doi: &Doi) -> Result<DoiRecord, RepositoryError>;

    /// Create a draft record; the service assigns the DOI.
    async fn create(&self, payload: &DoiDocument) -> Result<DoiRecord, RepositoryError>;

    /// Replace metadata or submit a state event.
    async fn update(&self, doi: &Doi, payload: &DoiDocument) -> Result<DoiRecord, RepositoryError>;

    /// Remove a record. The service only accepts this for drafts.
    async fn delete(&self, doi: &Doi) -> Result<(), RepositoryError>;
}
