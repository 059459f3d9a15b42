//! # Version Subcommand
//!
//! Maintains "replaced by" links between content items. Links only affect
//! the related identifiers of the next metadata update; no remote call is
//! made here.

use anyhow::Result;
use clap::{Args, Subcommand};
use pidtools_core::ContentItemId;
use pidtools_lifecycle::VersionManager;
use serde_json::json;

use crate::doi::print_json;

#[derive(Args, Debug)]
pub struct VersionArgs {
    #[command(subcommand)]
    pub command: VersionCommand,
}

#[derive(Subcommand, Debug)]
pub enum VersionCommand {
    /// Mark an item as replaced by a newer one.
    Set {
        /// The older item.
        #[arg(long)]
        item: u64,
        /// The item that replaces it.
        #[arg(long)]
        replaced_by: u64,
    },
    /// Remove an item's "replaced by" link.
    Clear {
        #[arg(long)]
        item: u64,
    },
}

pub fn run_version(args: &VersionArgs, versions: &VersionManager) -> Result<u8> {
    let result = match args.command {
        VersionCommand::Set { item, replaced_by } => versions
            .set_replaced_by(ContentItemId(item), ContentItemId(replaced_by))
            .map(|()| json!({ "item": item, "replaced_by": replaced_by })),
        VersionCommand::Clear { item } => versions
            .clear_replaced_by(ContentItemId(item))
            .map(|previous| json!({ "item": item, "previous": previous })),
    };
    match result {
        Ok(value) => {
            print_json(&value)?;
            Ok(0)
        }
        Err(failure) => {
            print_json(&failure)?;
            Ok(1)
        }
    }
}
