//! # pidtools-cli — DOI Lifecycle Command-Line Interface
//!
//! Provides the `pidtools` binary, an operator surface over
//! `pidtools-lifecycle` for content items listed in a catalog file.
//!
//! ```bash
//! pidtools inspect --item 42
//! pidtools save --item 42
//! pidtools register --item 42
//! pidtools publish --item 42
//! pidtools version set --item 41 --replaced-by 42
//! pidtools report > dois.csv
//! ```
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers delegate to the domain
//!   crates and hold no lifecycle logic of their own.
//! - Handlers return the process exit code: 0 on success, 1 when the
//!   operation reported a failure.

pub mod config;
pub mod context;
pub mod doi;
pub mod report;
pub mod version;
