use std::collections::{HashMap, HashSet};

use tracing::debug;

use roster_core::{DesiredUser, OrgName, OrgRole};

use crate::api::CloudApi;
use crate::context::{OrganizationMembership, Provenance, RunContext, Stage, StageReport};
use crate::error::{FailureCause, RunError};

use super::{settle_err, settle_ok, settle_skip, StepError};

/// Give every resolved resource user plain membership of their organization,
/// plus the declared org role when it is more than that. Holders are always
/// checked before assigning.
pub fn reconcile_org_membership(mut ctx: RunContext) -> Result<RunContext, RunError> {
    let mut report = StageReport::new(Stage::OrgMembership);
    let mut lookups = OrgLookups::default();
    let dry_run = ctx.options.dry_run;

    for record in ctx.users.iter_mut() {
        let Some(user) = record.resource_user.as_ref().filter(|_| !record.has_failed()) else {
            settle_skip(&mut report, record);
            continue;
        };
        let user_guid = user.guid.clone();
        match ensure_membership(
            &ctx.api,
            &mut lookups,
            &record.desired,
            user_guid.as_deref(),
            dry_run,
        ) {
            Ok(membership) => {
                settle_ok(&mut report, record, membership.provenance);
                record.org_membership = Some(membership);
            }
            Err(err) => settle_err(&mut report, record, err)?,
        }
    }

    ctx.reports.push(report);
    Ok(ctx)
}

/// Roles to hold, in assignment order.
fn required_roles(declared: OrgRole) -> Vec<OrgRole> {
    if declared == OrgRole::User {
        vec![OrgRole::User]
    } else {
        vec![OrgRole::User, declared]
    }
}

fn ensure_membership(
    api: &CloudApi,
    lookups: &mut OrgLookups,
    desired: &DesiredUser,
    user_guid: Option<&str>,
    dry_run: bool,
) -> Result<OrganizationMembership, StepError> {
    let org_guid = lookups.organization(api, &desired.org)?.ok_or_else(|| {
        StepError::Missing(FailureCause::OrganizationNotFound(desired.org.clone()))
    })?;

    let membership = |user_guid: Option<&str>, provenance| OrganizationMembership {
        org_guid: org_guid.clone(),
        user_guid: user_guid.map(str::to_string),
        role: desired.org_role,
        provenance,
    };

    let Some(user_guid) = user_guid else {
        return Ok(membership(None, Provenance::Planned));
    };

    let mut provenance = Provenance::Existing;
    for role in required_roles(desired.org_role) {
        if lookups.holders(api, &org_guid, role)?.contains(user_guid) {
            continue;
        }
        if dry_run {
            provenance = Provenance::Planned;
            continue;
        }
        api.assign_organization_role(&org_guid, role, user_guid)?;
        lookups.add_holder(&org_guid, role, user_guid);
        provenance = Provenance::Created;
    }
    Ok(membership(Some(user_guid), provenance))
}

/// Organization and role-holder lookups, cached for one stage run.
/// Unknown organizations are cached too.
#[derive(Default)]
struct OrgLookups {
    organizations: HashMap<OrgName, Option<String>>,
    holders: HashMap<(String, OrgRole), HashSet<String>>,
}

impl OrgLookups {
    fn organization(
        &mut self,
        api: &CloudApi,
        org: &OrgName,
    ) -> Result<Option<String>, StepError> {
        if let Some(cached) = self.organizations.get(org) {
            debug!(org = %org, "organization cache hit");
            return Ok(cached.clone());
        }
        let guid = api.find_organization(org)?;
        self.organizations.insert(org.clone(), guid.clone());
        Ok(guid)
    }

    fn holders(
        &mut self,
        api: &CloudApi,
        org_guid: &str,
        role: OrgRole,
    ) -> Result<&HashSet<String>, StepError> {
        let key = (org_guid.to_string(), role);
        if !self.holders.contains_key(&key) {
            let guids = api.organization_role_holders(org_guid, role)?;
            self.holders.insert(key.clone(), guids.into_iter().collect());
        }
        Ok(&*self.holders.entry(key).or_default())
    }

    fn add_holder(&mut self, org_guid: &str, role: OrgRole, user_guid: &str) {
        self.holders
            .entry((org_guid.to_string(), role))
            .or_default()
            .insert(user_guid.to_string());
    }
}
