//! What a finished run reports back to the host.

use serde::Serialize;

use roster_core::{LoginId, OrgName, SpaceName};

use crate::context::{Provenance, RunContext, StageReport, UserRecord, UserState};
use crate::error::ReconciliationError;

/// Final state of one user, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserOutcome {
    pub login: LoginId,
    pub org: OrgName,
    pub space: SpaceName,
    #[serde(flatten)]
    pub state: UserState,
    /// `true` when any link was created or assigned by this run.
    pub changed: bool,
    /// `true` when a dry run found something to create or assign.
    pub planned: bool,
}

impl UserOutcome {
    fn from_record(record: &UserRecord) -> Self {
        let provenances = [
            record.account.as_ref().map(|a| a.provenance),
            record.resource_user.as_ref().map(|u| u.provenance),
            record.org_membership.as_ref().map(|m| m.provenance),
            record.space_membership.as_ref().map(|m| m.provenance),
        ];
        let any = |wanted: Provenance| provenances.iter().flatten().any(|p| *p == wanted);
        Self {
            login: record.desired.login.clone(),
            org: record.desired.org.clone(),
            space: record.desired.space.clone(),
            state: record.state(),
            changed: any(Provenance::Created),
            planned: any(Provenance::Planned),
        }
    }
}

/// Result of a completed run, including runs with per-user failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub dry_run: bool,
    pub stages: Vec<StageReport>,
    pub users: Vec<UserOutcome>,
    pub failures: Vec<ReconciliationError>,
}

impl RunSummary {
    pub fn from_context(ctx: &RunContext) -> Self {
        Self {
            total: ctx.users().len(),
            dry_run: ctx.options().dry_run,
            stages: ctx.reports().to_vec(),
            users: ctx.users().iter().map(UserOutcome::from_record).collect(),
            failures: ctx
                .users()
                .iter()
                .flat_map(|record| record.failures.iter().cloned())
                .collect(),
        }
    }

    /// Every desired user reached space membership.
    pub fn is_success(&self) -> bool {
        self.users.iter().all(|u| u.state == UserState::SpaceMember)
    }

    pub fn failed_users(&self) -> usize {
        self.users
            .iter()
            .filter(|u| matches!(u.state, UserState::Failed { .. }))
            .count()
    }
}
