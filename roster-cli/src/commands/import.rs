//! `roster import`: reconcile the desired users against the platform.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

use roster_core::source;
use roster_sync::{pipeline, CloudApi, RunOptions, RunSummary, UserOutcome, UserState};

/// Arguments for `roster import`.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Desired-state YAML file.
    #[arg(short, long)]
    pub users: PathBuf,

    /// Environment YAML file (endpoints, client credentials, tuning).
    #[arg(short, long)]
    pub environment: PathBuf,

    /// Look everything up but create and assign nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ImportArgs {
    pub fn run(self) -> Result<()> {
        let environment = source::load_environment(&self.environment).with_context(|| {
            format!("failed to load environment '{}'", self.environment.display())
        })?;
        let entries = source::load_users(&self.users)
            .with_context(|| format!("failed to load users '{}'", self.users.display()))?;
        info!(
            users = entries.len(),
            api = %environment.api_base(),
            dry_run = self.dry_run,
            "starting import"
        );

        let api = CloudApi::connect(&environment).context("failed to set up the HTTP client")?;
        let summary = pipeline::run(
            api,
            entries,
            RunOptions {
                dry_run: self.dry_run,
            },
        )
        .context("import aborted")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("failed to serialize summary")?
            );
        } else {
            print_summary(&summary);
        }

        if !summary.is_success() {
            bail!(
                "{} of {} users did not reach their space role",
                summary.failed_users(),
                summary.total
            );
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "login")]
    login: String,
    #[tabled(rename = "org")]
    org: String,
    #[tabled(rename = "space")]
    space: String,
    #[tabled(rename = "result")]
    result: String,
}

#[derive(Tabled)]
struct StageRow {
    #[tabled(rename = "stage")]
    stage: String,
    #[tabled(rename = "unchanged")]
    unchanged: usize,
    #[tabled(rename = "changed")]
    changed: usize,
    #[tabled(rename = "planned")]
    planned: usize,
    #[tabled(rename = "failed")]
    failed: usize,
    #[tabled(rename = "skipped")]
    skipped: usize,
}

fn print_summary(summary: &RunSummary) {
    let prefix = if summary.dry_run { "[dry-run] " } else { "" };
    let headline = format!(
        "{prefix}{} users | {} failed",
        summary.total,
        summary.failed_users()
    );
    if summary.is_success() {
        println!("{} {headline}", "✓".green().bold());
    } else {
        println!("{} {headline}", "✗".red().bold());
    }

    if summary.users.is_empty() {
        println!("No users in the desired state.");
        return;
    }

    let rows: Vec<UserRow> = summary
        .users
        .iter()
        .map(|user| UserRow {
            login: user.login.to_string(),
            org: user.org.to_string(),
            space: user.space.to_string(),
            result: result_label(user),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let stages: Vec<StageRow> = summary
        .stages
        .iter()
        .map(|report| StageRow {
            stage: report.stage.to_string(),
            unchanged: report.unchanged,
            changed: report.changed,
            planned: report.planned,
            failed: report.failed,
            skipped: report.skipped,
        })
        .collect();
    let mut table = Table::new(stages);
    table.with(Style::rounded());
    println!("{table}");

    for failure in &summary.failures {
        println!("{} {failure}", "failed:".red());
    }
}

fn result_label(user: &UserOutcome) -> String {
    match user.state {
        UserState::Failed { stage } => format!("failed at {stage}").red().to_string(),
        UserState::SpaceMember if user.planned => "would change".yellow().to_string(),
        UserState::SpaceMember if user.changed => "changed".green().to_string(),
        UserState::SpaceMember => "unchanged".bright_black().to_string(),
        other => format!("{other:?}"),
    }
}
