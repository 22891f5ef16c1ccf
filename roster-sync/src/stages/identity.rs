use roster_core::DesiredUser;

use crate::api::CloudApi;
use crate::context::{IdentityAccount, Provenance, RunContext, Stage, StageReport};
use crate::error::RunError;

use super::{settle_err, settle_ok, settle_skip, StepError};

/// Look up or create the identity-provider account of every loaded user.
pub fn reconcile_identity_accounts(mut ctx: RunContext) -> Result<RunContext, RunError> {
    let mut report = StageReport::new(Stage::IdentityAccounts);
    let dry_run = ctx.options.dry_run;

    for record in ctx.users.iter_mut() {
        if record.has_failed() {
            settle_skip(&mut report, record);
            continue;
        }
        match resolve_account(&ctx.api, &record.desired, dry_run) {
            Ok(account) => {
                settle_ok(&mut report, record, account.provenance);
                record.account = Some(account);
            }
            Err(err) => settle_err(&mut report, record, err)?,
        }
    }

    ctx.reports.push(report);
    Ok(ctx)
}

fn resolve_account(
    api: &CloudApi,
    user: &DesiredUser,
    dry_run: bool,
) -> Result<IdentityAccount, StepError> {
    let account = |id, provenance| IdentityAccount {
        id,
        login: user.login.clone(),
        provenance,
    };

    if let Some(id) = api.find_account(&user.login)? {
        return Ok(account(Some(id), Provenance::Existing));
    }
    if dry_run {
        return Ok(account(None, Provenance::Planned));
    }
    let id = api.create_account(user)?;
    Ok(account(Some(id), Provenance::Created))
}
