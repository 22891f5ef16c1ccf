//! The working context threaded through every pipeline stage.
//!
//! One [`UserRecord`] per desired user, kept in input order. Each stage fills
//! in the next link of the chain (account, resource user, org membership,
//! space membership) or records a failure against the user.

use std::fmt;

use serde::Serialize;

use roster_auth::Credential;
use roster_core::{DesiredUser, LoginId, OrgRole, SpaceRole, UserEntry};

use crate::api::CloudApi;
use crate::error::{FailureCause, ReconciliationError};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Load,
    Authenticate,
    #[serde(rename = "identity")]
    IdentityAccounts,
    #[serde(rename = "resource-user")]
    ResourceUsers,
    OrgMembership,
    SpaceMembership,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Authenticate => "authenticate",
            Stage::IdentityAccounts => "identity",
            Stage::ResourceUsers => "resource-user",
            Stage::OrgMembership => "org-membership",
            Stage::SpaceMembership => "space-membership",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a reconciled object came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Already present remotely; nothing was changed.
    Existing,
    /// Created or assigned by this run.
    Created,
    /// Missing remotely; a dry run would have created or assigned it.
    Planned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityAccount {
    /// `None` only when the account is planned.
    pub id: Option<String>,
    pub login: LoginId,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceUser {
    pub guid: Option<String>,
    pub account_id: Option<String>,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationMembership {
    pub org_guid: String,
    pub user_guid: Option<String>,
    pub role: OrgRole,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceMembership {
    pub space_guid: String,
    pub user_guid: Option<String>,
    pub role: SpaceRole,
    pub provenance: Provenance,
}

/// Position of one user in the reconciliation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UserState {
    Loaded,
    IdentityResolved,
    ResourceUserResolved,
    OrgMember,
    SpaceMember,
    Failed { stage: Stage },
}

/// Everything the run knows about one desired user.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub desired: DesiredUser,
    pub account: Option<IdentityAccount>,
    pub resource_user: Option<ResourceUser>,
    pub org_membership: Option<OrganizationMembership>,
    pub space_membership: Option<SpaceMembership>,
    pub failures: Vec<ReconciliationError>,
}

impl UserRecord {
    pub fn new(desired: DesiredUser) -> Self {
        Self {
            desired,
            account: None,
            resource_user: None,
            org_membership: None,
            space_membership: None,
            failures: Vec::new(),
        }
    }

    pub fn login(&self) -> &LoginId {
        &self.desired.login
    }

    pub fn has_failed(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_at(&self, stage: Stage) -> bool {
        self.failures.iter().any(|f| f.stage == stage)
    }

    /// Record a failure at `stage`. The user takes no further part in the run.
    pub fn fail(&mut self, stage: Stage, cause: FailureCause) {
        self.failures.push(ReconciliationError {
            login: self.desired.login.clone(),
            stage,
            cause,
        });
    }

    pub fn state(&self) -> UserState {
        if let Some(first) = self.failures.first() {
            return UserState::Failed { stage: first.stage };
        }
        if self.space_membership.is_some() {
            UserState::SpaceMember
        } else if self.org_membership.is_some() {
            UserState::OrgMember
        } else if self.resource_user.is_some() {
            UserState::ResourceUserResolved
        } else if self.account.is_some() {
            UserState::IdentityResolved
        } else {
            UserState::Loaded
        }
    }
}

/// Per-run switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Look everything up, change nothing.
    pub dry_run: bool,
}

/// Counts for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    /// Users the stage worked on.
    pub processed: usize,
    pub unchanged: usize,
    pub changed: usize,
    pub planned: usize,
    pub failed: usize,
    /// Users left out because an earlier stage failed for them.
    pub skipped: usize,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            processed: 0,
            unchanged: 0,
            changed: 0,
            planned: 0,
            failed: 0,
            skipped: 0,
        }
    }

    pub(crate) fn record(&mut self, provenance: Provenance) {
        self.processed += 1;
        match provenance {
            Provenance::Existing => self.unchanged += 1,
            Provenance::Created => self.changed += 1,
            Provenance::Planned => self.planned += 1,
        }
    }

    pub(crate) fn record_failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }

    /// Users that ended the stage in a good state.
    pub fn succeeded(&self) -> usize {
        self.unchanged + self.changed + self.planned
    }
}

/// The aggregate root of one run. Owned by the driver and discarded at the
/// end, whatever the outcome.
pub struct RunContext {
    pub(crate) api: CloudApi,
    pub(crate) options: RunOptions,
    pub(crate) entries: Vec<UserEntry>,
    pub(crate) credential: Option<Credential>,
    pub(crate) users: Vec<UserRecord>,
    pub(crate) reports: Vec<StageReport>,
}

impl RunContext {
    pub fn new(api: CloudApi, entries: Vec<UserEntry>, options: RunOptions) -> Self {
        Self {
            api,
            options,
            entries,
            credential: None,
            users: Vec::new(),
            reports: Vec::new(),
        }
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Users in input order.
    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn reports(&self) -> &[StageReport] {
        &self.reports
    }
}

#[cfg(test)]
mod tests {
    use roster_core::{OrgName, SpaceName};

    use super::*;

    fn record() -> UserRecord {
        UserRecord::new(DesiredUser {
            login: LoginId::from("alice"),
            name: "Alice Doe".into(),
            email: None,
            external_id: None,
            org: OrgName::from("acme"),
            space: SpaceName::from("dev"),
            role: SpaceRole::Developer,
            org_role: OrgRole::User,
        })
    }

    #[test]
    fn state_follows_the_deepest_resolved_link() {
        let mut user = record();
        assert_eq!(user.state(), UserState::Loaded);

        user.account = Some(IdentityAccount {
            id: Some("uaa-alice".into()),
            login: user.login().clone(),
            provenance: Provenance::Existing,
        });
        assert_eq!(user.state(), UserState::IdentityResolved);

        user.resource_user = Some(ResourceUser {
            guid: Some("uaa-alice".into()),
            account_id: Some("uaa-alice".into()),
            provenance: Provenance::Created,
        });
        assert_eq!(user.state(), UserState::ResourceUserResolved);
    }

    #[test]
    fn first_failure_decides_failed_state() {
        let mut user = record();
        user.fail(Stage::OrgMembership, FailureCause::Request("boom".into()));
        user.fail(
            Stage::SpaceMembership,
            FailureCause::DependencyFailed(Stage::OrgMembership),
        );

        assert_eq!(
            user.state(),
            UserState::Failed {
                stage: Stage::OrgMembership
            }
        );
        assert!(user.failed_at(Stage::SpaceMembership));
        assert!(!user.failed_at(Stage::IdentityAccounts));
    }

    #[test]
    fn report_tallies_by_provenance() {
        let mut report = StageReport::new(Stage::IdentityAccounts);
        report.record(Provenance::Existing);
        report.record(Provenance::Created);
        report.record(Provenance::Planned);
        report.record_failure();

        assert_eq!(report.processed, 4);
        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn stage_names_are_stable() {
        assert_eq!(Stage::IdentityAccounts.to_string(), "identity");
        assert_eq!(
            serde_json::to_string(&Stage::OrgMembership).expect("json"),
            "\"org-membership\""
        );
    }
}
