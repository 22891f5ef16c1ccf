//! Error types for roster-sync.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use roster_auth::AuthError;
use roster_core::{ConfigError, LoginId, OrgName, SpaceName};

use crate::context::Stage;

/// Whole-run fatal errors. When one is returned no partial context survives.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The HTTP stack could not be constructed.
    #[error("setup failed: {0}")]
    Setup(String),
}

/// Why one user's step failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureCause {
    /// A lookup or mutation call failed.
    Request(String),
    OrganizationNotFound(OrgName),
    SpaceNotFound(SpaceName),
    /// Skipped because an earlier step for the same user failed.
    DependencyFailed(Stage),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Request(detail) => f.write_str(detail),
            FailureCause::OrganizationNotFound(org) => {
                write!(f, "organization '{org}' does not exist")
            }
            FailureCause::SpaceNotFound(space) => write!(f, "space '{space}' does not exist"),
            FailureCause::DependencyFailed(stage) => {
                write!(f, "skipped: {stage} did not succeed for this user")
            }
        }
    }
}

/// A per-user failure. Recorded, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{login} [{stage}]: {cause}")]
pub struct ReconciliationError {
    pub login: LoginId,
    pub stage: Stage,
    pub cause: FailureCause,
}
