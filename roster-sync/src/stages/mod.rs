//! Pipeline stages. Each one consumes the run context and hands it back
//! enriched, or returns a [`RunError`] that ends the run.

mod authenticate;
mod identity;
mod load;
mod org_membership;
mod resource_users;
mod space_membership;

pub use authenticate::authenticate;
pub use identity::reconcile_identity_accounts;
pub use load::load_desired_users;
pub use org_membership::reconcile_org_membership;
pub use resource_users::reconcile_resource_users;
pub use space_membership::reconcile_space_membership;

use tracing::{debug, info, warn};

use roster_auth::CallError;

use crate::context::{Provenance, StageReport, UserRecord};
use crate::error::{FailureCause, RunError};

/// Why one user's step did not complete.
pub(crate) enum StepError {
    Call(CallError),
    Missing(FailureCause),
}

impl From<CallError> for StepError {
    fn from(err: CallError) -> Self {
        StepError::Call(err)
    }
}

impl StepError {
    /// Per-user cause, or the run-fatal error when the credential is gone.
    fn into_cause(self) -> Result<FailureCause, RunError> {
        match self {
            StepError::Call(CallError::Auth(err)) => Err(RunError::Auth(err)),
            StepError::Call(other) => Ok(FailureCause::Request(other.to_string())),
            StepError::Missing(cause) => Ok(cause),
        }
    }
}

/// Log and tally a successful step.
pub(crate) fn settle_ok(report: &mut StageReport, record: &UserRecord, provenance: Provenance) {
    report.record(provenance);
    info!(
        login = %record.login(),
        stage = %report.stage,
        outcome = ?provenance,
        "user reconciled"
    );
}

/// Log and tally a user an earlier stage already failed.
pub(crate) fn settle_skip(report: &mut StageReport, record: &UserRecord) {
    report.skipped += 1;
    debug!(login = %record.login(), stage = %report.stage, "skipped");
}

/// Log, tally and record a failed step. Authentication failures propagate.
pub(crate) fn settle_err(
    report: &mut StageReport,
    record: &mut UserRecord,
    err: StepError,
) -> Result<(), RunError> {
    let cause = err.into_cause()?;
    warn!(login = %record.login(), stage = %report.stage, cause = %cause, "user failed");
    report.record_failure();
    record.fail(report.stage, cause);
    Ok(())
}
