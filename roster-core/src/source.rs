//! YAML loading of the two input files.
//!
//! ```text
//! users.yml         users: [ { login, name, email?, external_id?, org, space, role, org_role? } ]
//! environment.yml   uaa_url, api_url, client_id, client_secret, ...tuning
//! ```
//!
//! Loading only parses; [`crate::desired::validate`] and
//! [`Environment::validate`] enforce the invariants.

use std::path::Path;

use crate::config::Environment;
use crate::error::{io_err, ConfigError};
use crate::types::{UserEntry, UsersFile};

/// Load the raw desired-state records from `path`.
///
/// Returns `ConfigError::Io` if the file cannot be read and
/// `ConfigError::Parse` (with path + line context) if it is malformed.
pub fn load_users(path: &Path) -> Result<Vec<UserEntry>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let file: UsersFile = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(file.users)
}

/// Load and validate the environment descriptor from `path`.
pub fn load_environment(path: &Path) -> Result<Environment, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let env: Environment = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    env.validate()?;
    Ok(env)
}
