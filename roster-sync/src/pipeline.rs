//! The reconciliation driver.
//!
//! Stages are plain functions run in a fixed order over one [`RunContext`].
//! The first [`RunError`] ends the run and the context is dropped with it.

use tracing::info;

use roster_core::UserEntry;

use crate::api::CloudApi;
use crate::context::{RunContext, RunOptions, Stage};
use crate::error::RunError;
use crate::stages;
use crate::summary::RunSummary;

/// Signature shared by every stage.
pub type StageFn = fn(RunContext) -> Result<RunContext, RunError>;

/// One named entry in the stage list.
#[derive(Clone, Copy)]
pub struct StageStep {
    pub stage: Stage,
    pub run: StageFn,
}

/// The full reconciliation, in execution order.
pub const STAGES: [StageStep; 6] = [
    StageStep {
        stage: Stage::Load,
        run: stages::load_desired_users,
    },
    StageStep {
        stage: Stage::Authenticate,
        run: stages::authenticate,
    },
    StageStep {
        stage: Stage::IdentityAccounts,
        run: stages::reconcile_identity_accounts,
    },
    StageStep {
        stage: Stage::ResourceUsers,
        run: stages::reconcile_resource_users,
    },
    StageStep {
        stage: Stage::OrgMembership,
        run: stages::reconcile_org_membership,
    },
    StageStep {
        stage: Stage::SpaceMembership,
        run: stages::reconcile_space_membership,
    },
];

/// Reconcile `entries` against the platform behind `api`.
///
/// Per-user failures are part of the returned summary. Only a bad desired
/// state or an exhausted token exchange returns `Err`.
pub fn run(
    api: CloudApi,
    entries: Vec<UserEntry>,
    options: RunOptions,
) -> Result<RunSummary, RunError> {
    let ctx = run_stages(RunContext::new(api, entries, options), &STAGES)?;
    Ok(RunSummary::from_context(&ctx))
}

/// Thread `ctx` through `steps`, stopping at the first fatal error.
pub fn run_stages(mut ctx: RunContext, steps: &[StageStep]) -> Result<RunContext, RunError> {
    for step in steps {
        info!(stage = %step.stage, dry_run = ctx.options().dry_run, "stage started");
        ctx = (step.run)(ctx)?;
        if let Some(report) = ctx.reports().last().filter(|r| r.stage == step.stage) {
            info!(
                stage = %step.stage,
                processed = report.processed,
                unchanged = report.unchanged,
                changed = report.changed,
                planned = report.planned,
                failed = report.failed,
                skipped = report.skipped,
                "stage finished"
            );
        } else {
            info!(stage = %step.stage, "stage finished");
        }
    }
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_run_in_declared_order() {
        let order: Vec<Stage> = STAGES.iter().map(|s| s.stage).collect();
        assert_eq!(
            order,
            [
                Stage::Load,
                Stage::Authenticate,
                Stage::IdentityAccounts,
                Stage::ResourceUsers,
                Stage::OrgMembership,
                Stage::SpaceMembership,
            ]
        );
    }
}
