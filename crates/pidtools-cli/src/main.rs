//! # pidtools CLI entry point
//!
//! Parses command-line arguments, loads the configuration file and
//! dispatches to subcommand handlers on a single-threaded runtime.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pidtools_core::StateEvent;
use tracing_subscriber::EnvFilter;

use pidtools_cli::config::PidtoolsConfig;
use pidtools_cli::context::AppContext;
use pidtools_cli::doi::{run_doi, Action, ItemArgs};
use pidtools_cli::report::run_report;
use pidtools_cli::version::{run_version, VersionArgs};

/// DOI lifecycle tooling for catalog content items.
///
/// Creates, updates, transitions and deletes DataCite DOIs, keeping a local
/// record of which item holds which DOI.
#[derive(Parser, Debug)]
#[command(name = "pidtools", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "pidtools.yaml")]
    config: PathBuf,

    /// Print every lifecycle event to stderr as a JSON line.
    #[arg(long, global = true)]
    events: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show candidate metadata, the remote record and changed fields.
    Inspect(ItemArgs),
    /// Create a draft DOI for an item.
    Create(ItemArgs),
    /// Resend an item's metadata to its DOI.
    Update(ItemArgs),
    /// Create a DOI if the item has none, otherwise update it.
    Save(ItemArgs),
    /// Register a draft DOI (irreversible).
    Register(ItemArgs),
    /// Make a registered DOI findable.
    Publish(ItemArgs),
    /// Hide a findable DOI.
    Hide(ItemArgs),
    /// Delete a draft DOI.
    Delete(ItemArgs),
    /// Print `doi,target_url` lines for every associated item.
    Report,
    /// Manage "replaced by" links between items.
    Version(VersionArgs),
}

impl Commands {
    fn doi_action(&self) -> Option<(Action, ItemArgs)> {
        let action = match self {
            Self::Inspect(args) => (Action::Inspect, *args),
            Self::Create(args) => (Action::Create, *args),
            Self::Update(args) => (Action::Update, *args),
            Self::Save(args) => (Action::Save, *args),
            Self::Register(args) => (Action::Transition(StateEvent::Register), *args),
            Self::Publish(args) => (Action::Transition(StateEvent::Publish), *args),
            Self::Hide(args) => (Action::Transition(StateEvent::Hide), *args),
            Self::Delete(args) => (Action::Delete, *args),
            Self::Report | Self::Version(_) => return None,
        };
        Some(action)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let config = PidtoolsConfig::load(&cli.config)?;
    let ctx = AppContext::open(config, cli.events)?;

    if let Some((action, args)) = cli.command.doi_action() {
        let manager = ctx.manager()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        return runtime.block_on(run_doi(action, &args, &manager));
    }

    match &cli.command {
        Commands::Report => run_report(
            ctx.store.as_ref(),
            ctx.assembler.as_ref(),
            &mut std::io::stdout().lock(),
        ),
        Commands::Version(args) => run_version(args, &ctx.versions()),
        _ => Ok(0),
    }
}
