//! # pidtools-lifecycle — DOI Lifecycle Orchestration
//!
//! Ties the pieces together for one content item at a time:
//!
//! - [`MetadataAssembler`] builds the candidate metadata
//!   ([`ContentItemAssembler`] does so from a [`ContentCatalog`]).
//! - [`LifecycleManager`] runs create / update / state change / delete
//!   against a [`DoiRepository`](pidtools_client::DoiRepository) and keeps
//!   the [`AssociationStore`] in step with the remote record.
//! - [`EventRegistry`] delivers typed [`LifecycleEvent`]s to listeners,
//!   synchronously and in registration order.
//! - [`VersionManager`] maintains "replaced by" links between items.
//! - [`doi_report`] lists every associated DOI with its landing page.
//!
//! ## Execution Model
//!
//! One operation per request, run to completion. There is no queue, no
//! retry and no per-item locking; the local store is last-writer-wins.

pub mod assembler;
pub mod association;
pub mod error;
pub mod events;
pub mod manager;
pub mod report;
pub mod versioning;

pub use assembler::{
    clean_text, AssemblerConfig, Author, ContentCatalog, ContentItem, ContentItemAssembler,
    InMemoryCatalog, MetadataAssembler, PublicationStatus,
};
pub use association::{
    AssociationStore, InMemoryStore, JsonFileStore, LocalAssociation, VersionLinkStore,
};
pub use error::{AssemblyError, LifecycleError, OperationFailure, StoreError};
pub use events::{
    EventListener, EventRegistry, LifecycleEvent, Operation, RecordingListener, TracingListener,
};
pub use manager::{
    Inspection, LifecycleConfig, LifecycleManager, OperationOutcome, OperationSuccess,
};
pub use report::{doi_report, to_csv, ReportRow};
pub use versioning::VersionManager;
