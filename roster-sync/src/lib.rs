//! # roster-sync
//!
//! Reconciles the desired users against the identity provider and the
//! resource manager.
//!
//! Build a [`CloudApi`] (usually with [`CloudApi::connect`]) and hand it to
//! [`pipeline::run`] with the raw desired-state entries.

pub mod api;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod stages;
pub mod summary;

pub use api::{CloudApi, Endpoints};
pub use context::{
    IdentityAccount, OrganizationMembership, Provenance, ResourceUser, RunContext, RunOptions,
    SpaceMembership, Stage, StageReport, UserRecord, UserState,
};
pub use error::{FailureCause, ReconciliationError, RunError};
pub use pipeline::{run, run_stages, StageStep, STAGES};
pub use summary::{RunSummary, UserOutcome};
