//! Permission actions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use inkwell_core::error::AppError;

/// The verb half of a permission rule.
///
/// `Manage` is the wildcard: a rule with it satisfies every action on its
/// subject. Anything outside the built-in verbs is kept as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PermissionAction {
    Create,
    Read,
    Update,
    Delete,
    Manage,
    Owner,
    Custom(String),
}

impl PermissionAction {
    pub fn custom(verb: impl Into<String>) -> Self {
        let verb = verb.into();
        // Route through the parser so "owner" never ends up as Custom("owner").
        match verb.parse() {
            Ok(action) => action,
            Err(_) => Self::Custom(verb),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Manage => "manage",
            Self::Owner => "owner",
            Self::Custom(verb) => verb,
        }
    }

    /// Whether a rule carrying `self` grants `requested`.
    pub fn grants(&self, requested: &PermissionAction) -> bool {
        matches!(self, Self::Manage) || self == requested
    }
}

impl fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "manage" => Ok(Self::Manage),
            "owner" => Ok(Self::Owner),
            "" => Err(AppError::validation("Permission action cannot be empty")),
            other if other.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') => {
                Ok(Self::Custom(other.to_string()))
            }
            other => Err(AppError::validation(format!(
                "Invalid permission action: '{other}'"
            ))),
        }
    }
}

impl Serialize for PermissionAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PermissionAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_builtin_and_custom() {
        assert_eq!("owner".parse::<PermissionAction>().unwrap(), PermissionAction::Owner);
        assert_eq!(
            "sended-manage".parse::<PermissionAction>().unwrap(),
            PermissionAction::Custom("sended-manage".into())
        );
        assert!("drop table".parse::<PermissionAction>().is_err());
        assert!("".parse::<PermissionAction>().is_err());
    }

    #[test]
    fn test_custom_normalizes_builtin_names() {
        assert_eq!(PermissionAction::custom("read"), PermissionAction::Read);
    }

    #[test]
    fn test_manage_grants_everything() {
        assert!(PermissionAction::Manage.grants(&PermissionAction::Delete));
        assert!(PermissionAction::Manage.grants(&PermissionAction::custom("recevied-manage")));
        assert!(!PermissionAction::Read.grants(&PermissionAction::Update));
        assert!(PermissionAction::Owner.grants(&PermissionAction::Owner));
    }
}
