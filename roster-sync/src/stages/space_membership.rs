use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use roster_core::{DesiredUser, SpaceName, SpaceRole};

use crate::api::CloudApi;
use crate::context::{
    OrganizationMembership, Provenance, RunContext, SpaceMembership, Stage, StageReport,
};
use crate::error::{FailureCause, RunError};

use super::{settle_err, settle_ok, settle_skip, StepError};

/// Grant every org member the declared space role. A user whose org step
/// failed is recorded as a dependent failure and never attempted.
pub fn reconcile_space_membership(mut ctx: RunContext) -> Result<RunContext, RunError> {
    let mut report = StageReport::new(Stage::SpaceMembership);
    let mut lookups = SpaceLookups::default();
    let dry_run = ctx.options.dry_run;

    for record in ctx.users.iter_mut() {
        let Some(org) = record.org_membership.clone().filter(|_| !record.has_failed()) else {
            if record.failed_at(Stage::OrgMembership) {
                warn!(login = %record.login(), "org membership failed; skipping space role");
                record.fail(
                    Stage::SpaceMembership,
                    FailureCause::DependencyFailed(Stage::OrgMembership),
                );
            }
            settle_skip(&mut report, record);
            continue;
        };
        match ensure_membership(&ctx.api, &mut lookups, &record.desired, &org, dry_run) {
            Ok(membership) => {
                settle_ok(&mut report, record, membership.provenance);
                record.space_membership = Some(membership);
            }
            Err(err) => settle_err(&mut report, record, err)?,
        }
    }

    ctx.reports.push(report);
    Ok(ctx)
}

fn ensure_membership(
    api: &CloudApi,
    lookups: &mut SpaceLookups,
    desired: &DesiredUser,
    org: &OrganizationMembership,
    dry_run: bool,
) -> Result<SpaceMembership, StepError> {
    let space_guid = lookups
        .space(api, &org.org_guid, &desired.space)?
        .ok_or_else(|| StepError::Missing(FailureCause::SpaceNotFound(desired.space.clone())))?;

    let Some(user_guid) = org.user_guid.as_deref() else {
        return Ok(SpaceMembership {
            space_guid,
            user_guid: None,
            role: desired.role,
            provenance: Provenance::Planned,
        });
    };

    let provenance = if lookups
        .holders(api, &space_guid, desired.role)?
        .contains(user_guid)
    {
        Provenance::Existing
    } else if dry_run {
        Provenance::Planned
    } else {
        api.assign_space_role(&space_guid, desired.role, user_guid)?;
        lookups.add_holder(&space_guid, desired.role, user_guid);
        Provenance::Created
    };

    Ok(SpaceMembership {
        space_guid,
        user_guid: Some(user_guid.to_string()),
        role: desired.role,
        provenance,
    })
}

/// Space and role-holder lookups, cached for one stage run.
#[derive(Default)]
struct SpaceLookups {
    spaces: HashMap<(String, SpaceName), Option<String>>,
    holders: HashMap<(String, SpaceRole), HashSet<String>>,
}

impl SpaceLookups {
    fn space(
        &mut self,
        api: &CloudApi,
        org_guid: &str,
        space: &SpaceName,
    ) -> Result<Option<String>, StepError> {
        let key = (org_guid.to_string(), space.clone());
        if let Some(cached) = self.spaces.get(&key) {
            debug!(space = %space, "space cache hit");
            return Ok(cached.clone());
        }
        let guid = api.find_space(org_guid, space)?;
        self.spaces.insert(key, guid.clone());
        Ok(guid)
    }

    fn holders(
        &mut self,
        api: &CloudApi,
        space_guid: &str,
        role: SpaceRole,
    ) -> Result<&HashSet<String>, StepError> {
        let key = (space_guid.to_string(), role);
        if !self.holders.contains_key(&key) {
            let guids = api.space_role_holders(space_guid, role)?;
            self.holders.insert(key.clone(), guids.into_iter().collect());
        }
        Ok(&*self.holders.entry(key).or_default())
    }

    fn add_holder(&mut self, space_guid: &str, role: SpaceRole, user_guid: &str) {
        self.holders
            .entry((space_guid.to_string(), role))
            .or_default()
            .insert(user_guid.to_string());
    }
}
