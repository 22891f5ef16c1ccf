//! Roster: reconcile directory users onto a Cloud Foundry style platform.
//!
//! # Usage
//!
//! ```text
//! roster import --users users.yml --environment env.yml [--dry-run] [--json]
//! roster check --users users.yml [--environment env.yml]
//! ```
//!
//! Logs go to stderr (filter with `RUST_LOG`); stdout carries the summary.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, import::ImportArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "roster",
    version,
    about = "Reconcile desired users, org and space roles against the platform",
    long_about = None,
)]
struct Cli {
    /// Emit log events as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create missing accounts, users and role assignments.
    Import(ImportArgs),

    /// Validate input files without contacting the platform.
    Check(CheckArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    match cli.command {
        Commands::Import(args) => args.run(),
        Commands::Check(args) => args.run(),
    }
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
