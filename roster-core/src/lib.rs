//! Roster core library: domain types, input loading, validation, errors.
//!
//! - [`types`]: newtypes, roles and records
//! - [`desired`]: validation of the desired-state list
//! - [`config`]: the environment/connection descriptor
//! - [`source`]: YAML loading of both input files
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod desired;
pub mod error;
pub mod source;
pub mod types;

pub use config::Environment;
pub use error::ConfigError;
pub use types::{
    DesiredUser, LoginId, OrgName, OrgRole, SpaceName, SpaceRole, UserEntry, UsersFile,
};
