//! # pidtools-core — Foundational Types for DOI Lifecycle Management
//!
//! This crate defines the vocabulary shared by the repository client and the
//! lifecycle manager. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `Doi` and `ContentItemId` are
//!    distinct types with validated constructors. No bare strings for DOIs.
//!
//! 2. **Tagged-union metadata.** Remote and locally derived metadata share one
//!    representation, [`MetadataValue`], so the field differ can recurse with
//!    exhaustive `match` instead of probing untyped JSON.
//!
//! 3. **A fixed candidate contract.** [`CandidateMetadata`] always carries the
//!    same key set. Missing source data yields empty sequences, never missing
//!    keys (`url` is the single exception).
//!
//! 4. **The remote service owns the state machine.** [`DoiState`] and
//!    [`StateEvent`] name states and events; nothing in this workspace rejects
//!    a transition locally.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pidtools-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod diff;
pub mod error;
pub mod identity;
pub mod metadata;
pub mod state;
pub mod value;

pub use diff::{changed_fields, DiffPolicy};
pub use error::CoreError;
pub use identity::{ContentItemId, Doi};
pub use metadata::{
    Affiliation, AlternateIdentifier, CandidateMetadata, Creator, DateEntry, Description,
    NameIdentifier, RelatedIdentifier, RelatedItem, RelatedItemIdentifier, ResourceTypes, Subject,
    Title,
};
pub use state::{DoiAction, DoiState, StateEvent};
pub use value::{Attributes, MetadataValue, Scalar};
