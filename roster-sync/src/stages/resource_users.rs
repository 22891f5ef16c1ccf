use crate::api::CloudApi;
use crate::context::{IdentityAccount, Provenance, ResourceUser, RunContext, Stage, StageReport};
use crate::error::RunError;

use super::{settle_err, settle_ok, settle_skip, StepError};

/// Make sure every resolved identity account is known to the resource
/// manager. Works only from the accounts the identity stage produced.
pub fn reconcile_resource_users(mut ctx: RunContext) -> Result<RunContext, RunError> {
    let mut report = StageReport::new(Stage::ResourceUsers);
    let dry_run = ctx.options.dry_run;

    for record in ctx.users.iter_mut() {
        let Some(account) = record.account.as_ref().filter(|_| !record.has_failed()) else {
            settle_skip(&mut report, record);
            continue;
        };
        match resolve_resource_user(&ctx.api, account, dry_run) {
            Ok(user) => {
                settle_ok(&mut report, record, user.provenance);
                record.resource_user = Some(user);
            }
            Err(err) => settle_err(&mut report, record, err)?,
        }
    }

    ctx.reports.push(report);
    Ok(ctx)
}

fn resolve_resource_user(
    api: &CloudApi,
    account: &IdentityAccount,
    dry_run: bool,
) -> Result<ResourceUser, StepError> {
    let Some(account_id) = account.id.as_deref() else {
        // The account itself is only planned.
        return Ok(ResourceUser {
            guid: None,
            account_id: None,
            provenance: Provenance::Planned,
        });
    };
    let user = |guid, provenance| ResourceUser {
        guid: Some(guid),
        account_id: Some(account_id.to_string()),
        provenance,
    };

    if let Some(guid) = api.find_resource_user(account_id)? {
        return Ok(user(guid, Provenance::Existing));
    }
    if dry_run {
        return Ok(ResourceUser {
            guid: None,
            account_id: Some(account_id.to_string()),
            provenance: Provenance::Planned,
        });
    }
    let guid = api.create_resource_user(account_id)?;
    Ok(user(guid, Provenance::Created))
}
