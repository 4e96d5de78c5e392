//! The six standard CRUD actions and their HTTP shape.

use std::fmt;
use std::str::FromStr;

use axum::http::Method;

use inkwell_core::error::AppError;

/// A standard action a controller can enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrudAction {
    List,
    Detail,
    Store,
    Update,
    Delete,
    Restore,
}

impl CrudAction {
    /// Every action except `Restore`, for services without a trash.
    pub const PLAIN: &'static [CrudAction] = &[
        CrudAction::List,
        CrudAction::Detail,
        CrudAction::Store,
        CrudAction::Update,
        CrudAction::Delete,
    ];

    pub const ALL: &'static [CrudAction] = &[
        CrudAction::List,
        CrudAction::Detail,
        CrudAction::Store,
        CrudAction::Update,
        CrudAction::Delete,
        CrudAction::Restore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Detail => "detail",
            Self::Store => "store",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Restore => "restore",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Self::List | Self::Detail => Method::GET,
            Self::Store => Method::POST,
            Self::Update | Self::Restore => Method::PATCH,
            Self::Delete => Method::DELETE,
        }
    }

    /// Path below the controller's own path.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Detail => "/{id}",
            Self::Restore => "/restore",
            _ => "/",
        }
    }
}

impl fmt::Display for CrudAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrudAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| AppError::configuration(format!("Unknown CRUD action '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_shape() {
        assert_eq!(CrudAction::List.method(), Method::GET);
        assert_eq!(CrudAction::Detail.suffix(), "/{id}");
        assert_eq!(CrudAction::Update.method(), Method::PATCH);
        assert_eq!(CrudAction::Update.suffix(), "/");
        assert_eq!(CrudAction::Delete.method(), Method::DELETE);
        assert_eq!(CrudAction::Restore.suffix(), "/restore");
    }

    #[test]
    fn test_parse() {
        assert_eq!("restore".parse::<CrudAction>().unwrap(), CrudAction::Restore);
        assert!("purge".parse::<CrudAction>().is_err());
    }
}
