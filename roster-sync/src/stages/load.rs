use tracing::info;

use roster_core::desired;

use crate::context::{RunContext, Stage, StageReport, UserRecord};
use crate::error::RunError;

/// Validate the raw entries into desired users. Any violation ends the run
/// before a single network call.
pub fn load_desired_users(mut ctx: RunContext) -> Result<RunContext, RunError> {
    let desired = desired::validate(&ctx.entries)?;

    let mut report = StageReport::new(Stage::Load);
    report.processed = desired.len();
    report.unchanged = desired.len();

    ctx.users = desired.into_iter().map(UserRecord::new).collect();
    ctx.reports.push(report);
    info!(users = ctx.users.len(), "desired users loaded");
    Ok(ctx)
}
