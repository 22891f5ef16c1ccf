use tracing::info;

use crate::context::RunContext;
use crate::error::RunError;

/// Obtain the run's first credential, so an exhausted token exchange stops
/// the run before any per-user work.
pub fn authenticate(mut ctx: RunContext) -> Result<RunContext, RunError> {
    let credential = ctx.api.gateway().credential()?;
    info!(usable_until = %credential.usable_until(), "credential obtained");
    ctx.credential = Some(credential);
    Ok(ctx)
}
