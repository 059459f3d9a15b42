//! # Report Subcommand
//!
//! Prints `doi,target_url` CSV lines for every associated item.

use std::io::Write;

use anyhow::{Context, Result};
use pidtools_lifecycle::{doi_report, to_csv, AssociationStore, MetadataAssembler};

pub fn run_report(
    associations: &dyn AssociationStore,
    assembler: &dyn MetadataAssembler,
    out: &mut dyn Write,
) -> Result<u8> {
    let rows = doi_report(associations, assembler).context("cannot read associations")?;
    out.write_all(to_csv(&rows).as_bytes())?;
    tracing::info!(rows = rows.len(), "DOI report written");
    Ok(0)
}
