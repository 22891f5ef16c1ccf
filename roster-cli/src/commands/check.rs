//! `roster check`: offline validation of the input files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use roster_core::{desired, source};

/// Arguments for `roster check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Desired-state YAML file.
    #[arg(short, long)]
    pub users: PathBuf,

    /// Also validate this environment file.
    #[arg(short, long)]
    pub environment: Option<PathBuf>,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        if let Some(path) = &self.environment {
            let env = source::load_environment(path)
                .with_context(|| format!("invalid environment '{}'", path.display()))?;
            if env.skip_tls_verification {
                println!(
                    "{} TLS certificate verification is disabled for {}",
                    "warning:".yellow().bold(),
                    env.api_base()
                );
            }
        }

        let entries = source::load_users(&self.users)
            .with_context(|| format!("failed to load users '{}'", self.users.display()))?;
        let users = desired::validate(&entries)
            .with_context(|| format!("invalid users '{}'", self.users.display()))?;

        let orgs = users
            .iter()
            .map(|u| &u.org)
            .collect::<std::collections::HashSet<_>>()
            .len();
        println!(
            "{} {} users across {} organizations",
            "✓".green().bold(),
            users.len(),
            orgs
        );
        Ok(())
    }
}
