//! # pidtools-client -- Typed Rust client for the DataCite REST API
//!
//! Wraps the four `/dois` operations the lifecycle manager needs:
//! - **get** a record (including soft-deleted records returned with 410)
//! - **create** a draft record, the service assigning the DOI
//! - **update** metadata, or submit a `register` / `publish` / `hide` event
//! - **delete** a draft record
//!
//! ## Architecture
//!
//! [`DoiRepository`] is the seam: the lifecycle manager holds an
//! `Arc<dyn DoiRepository>` and never builds HTTP requests itself.
//! [`DataCiteClient`] is the only implementation that talks to the network.
//!
//! Calls are made once. There is no retry, backoff or response caching;
//! a transport failure surfaces immediately as [`RepositoryError::Transport`].

pub mod client;
pub mod config;
pub mod error;
pub mod repository;
pub mod types;

pub use client::DataCiteClient;
pub use config::{ConfigError, DataCiteConfig, DEFAULT_SERVICE_URL};
pub use error::{RepositoryError, RepositoryOperation};
pub use repository::DoiRepository;
pub use types::{DoiData, DoiDocument, DoiMeta, DoiRecord, Tombstone, JSONAPI_MEDIA_TYPE};
