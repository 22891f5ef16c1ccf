//! Validation and normalization of the desired-state list.
//!
//! Fails fast: the first offending record aborts the whole load, and the
//! error names the record and the field. Input order is preserved exactly.

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::types::{DesiredUser, LoginId, OrgName, OrgRole, SpaceName, SpaceRole, UserEntry};

/// Validate raw entries into desired users, preserving their order.
pub fn validate(entries: &[UserEntry]) -> Result<Vec<DesiredUser>, ConfigError> {
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(entries.len());
    let mut users = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let position = index + 1;
        let user = normalize(entry, position)?;

        // Logins are case-insensitive on the identity provider.
        let key = user.login.0.to_lowercase();
        if let Some(first) = seen.insert(key, position) {
            return Err(ConfigError::DuplicateLogin {
                login: user.login.0,
                first,
                second: position,
            });
        }
        users.push(user);
    }

    Ok(users)
}

fn normalize(entry: &UserEntry, position: usize) -> Result<DesiredUser, ConfigError> {
    let login = entry.login.trim();
    let record = if login.is_empty() {
        format!("#{position}")
    } else {
        login.to_string()
    };
    let invalid = |field: &'static str, reason: String| ConfigError::InvalidField {
        record: record.clone(),
        field,
        reason,
    };

    if login.is_empty() {
        return Err(invalid("login", "must not be empty".into()));
    }
    let org = required(&entry.org).ok_or_else(|| invalid("org", "must not be empty".into()))?;
    let space =
        required(&entry.space).ok_or_else(|| invalid("space", "must not be empty".into()))?;
    let role = required(&entry.role).ok_or_else(|| invalid("role", "must not be empty".into()))?;
    let role: SpaceRole = role.parse().map_err(|reason| invalid("role", reason))?;
    let org_role = match entry.org_role.as_deref().and_then(required) {
        Some(raw) => raw
            .parse::<OrgRole>()
            .map_err(|reason| invalid("org_role", reason))?,
        None => OrgRole::User,
    };

    Ok(DesiredUser {
        login: LoginId::from(login),
        name: entry.name.trim().to_string(),
        email: entry.email.as_deref().and_then(required).map(str::to_string),
        external_id: entry
            .external_id
            .as_deref()
            .and_then(required)
            .map(str::to_string),
        org: OrgName::from(org),
        space: SpaceName::from(space),
        role,
        org_role,
    })
}

fn required(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(login: &str) -> UserEntry {
        UserEntry {
            login: login.to_string(),
            name: "Jane Doe".to_string(),
            org: "acme".to_string(),
            space: "dev".to_string(),
            role: "developer".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn trims_whitespace_and_defaults_org_role() {
        let mut raw = entry("  jdoe ");
        raw.org = " acme ".into();
        raw.email = Some("   ".into());
        let users = validate(&[raw]).expect("valid");
        assert_eq!(users[0].login, LoginId::from("jdoe"));
        assert_eq!(users[0].org, OrgName::from("acme"));
        assert_eq!(users[0].org_role, OrgRole::User);
        assert!(users[0].email.is_none(), "blank email is dropped");
    }

    #[test]
    fn missing_login_is_reported_by_position() {
        let err = validate(&[entry("a"), entry("")]).unwrap_err();
        match err {
            ConfigError::InvalidField { record, field, .. } => {
                assert_eq!(record, "#2");
                assert_eq!(field, "login");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_detection_ignores_case() {
        let err = validate(&[entry("JDoe"), entry("other"), entry("jdoe")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateLogin {
                first: 1,
                second: 3,
                ..
            }
        ));
    }

    #[test]
    fn explicit_org_role_is_parsed() {
        let mut raw = entry("jdoe");
        raw.org_role = Some("billing_manager".into());
        let users = validate(&[raw]).expect("valid");
        assert_eq!(users[0].org_role, OrgRole::BillingManager);
    }
}
