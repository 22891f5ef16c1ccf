//! Domain types for the desired-state roster.
//!
//! Raw [`UserEntry`] records are what the YAML file contains; a
//! [`DesiredUser`] is an entry that passed validation in [`crate::desired`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Login identifier of an account (the identity provider's `userName`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoginId(pub String);

impl fmt::Display for LoginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for LoginId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LoginId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Name of an organization in the resource manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgName(pub String);

impl fmt::Display for OrgName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for OrgName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Name of a space, unique within its organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpaceName(pub String);

impl fmt::Display for SpaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SpaceName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Role a user holds inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    /// Plain membership. Every other org role and every space role needs it.
    #[default]
    User,
    Manager,
    BillingManager,
    Auditor,
}

impl OrgRole {
    /// Collection segment used by the resource manager's org role routes.
    pub fn path_segment(self) -> &'static str {
        match self {
            OrgRole::User => "users",
            OrgRole::Manager => "managers",
            OrgRole::BillingManager => "billing_managers",
            OrgRole::Auditor => "auditors",
        }
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrgRole::User => write!(f, "user"),
            OrgRole::Manager => write!(f, "manager"),
            OrgRole::BillingManager => write!(f, "billing_manager"),
            OrgRole::Auditor => write!(f, "auditor"),
        }
    }
}

impl FromStr for OrgRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.strip_prefix("org_").unwrap_or(&normalized) {
            "user" | "member" => Ok(OrgRole::User),
            "manager" => Ok(OrgRole::Manager),
            "billing_manager" => Ok(OrgRole::BillingManager),
            "auditor" => Ok(OrgRole::Auditor),
            _ => Err(format!(
                "unknown organization role '{s}'; expected: user, manager, billing_manager, auditor"
            )),
        }
    }
}

/// Role a user holds inside a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceRole {
    Developer,
    Manager,
    Auditor,
}

impl SpaceRole {
    /// Collection segment used by the resource manager's space role routes.
    pub fn path_segment(self) -> &'static str {
        match self {
            SpaceRole::Developer => "developers",
            SpaceRole::Manager => "managers",
            SpaceRole::Auditor => "auditors",
        }
    }
}

impl fmt::Display for SpaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpaceRole::Developer => write!(f, "developer"),
            SpaceRole::Manager => write!(f, "manager"),
            SpaceRole::Auditor => write!(f, "auditor"),
        }
    }
}

impl FromStr for SpaceRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.strip_prefix("space_").unwrap_or(&normalized) {
            "developer" => Ok(SpaceRole::Developer),
            "manager" => Ok(SpaceRole::Manager),
            "auditor" => Ok(SpaceRole::Auditor),
            _ => Err(format!(
                "unknown space role '{s}'; expected: developer, manager, auditor"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One record of the desired-state file, exactly as written.
///
/// Required fields default to empty strings so that a missing key surfaces as
/// a field-level validation error naming the record, not as a YAML error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserEntry {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Directory distinguished name, passed through to the identity provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub space: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_role: Option<String>,
}

/// Root of the desired-state YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsersFile {
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

/// A validated, normalized desired user. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesiredUser {
    pub login: LoginId,
    pub name: String,
    pub email: Option<String>,
    pub external_id: Option<String>,
    pub org: OrgName,
    pub space: SpaceName,
    pub role: SpaceRole,
    pub org_role: OrgRole,
}

impl DesiredUser {
    /// Email sent on account creation; falls back to the login.
    pub fn email_or_login(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.login.0)
    }

    /// `(given, family)` split of the display name on its first whitespace.
    pub fn name_parts(&self) -> (&str, &str) {
        let name = if self.name.is_empty() {
            self.login.0.as_str()
        } else {
            self.name.as_str()
        };
        match name.split_once(char::is_whitespace) {
            Some((given, family)) => (given, family.trim()),
            None => (name, name),
        }
    }
}
