//! Soft-delete visibility for list queries.

use serde::{Deserialize, Serialize};

/// Which rows a list query returns with respect to soft deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrashMode {
    /// Only rows that are not soft-deleted.
    #[default]
    None,
    /// Only soft-deleted rows.
    Only,
    /// Every row.
    All,
}

impl TrashMode {
    /// SQL predicate on a `deleted_at` column implementing this mode.
    pub fn sql_predicate(&self, column: &str) -> String {
        match self {
            Self::None => format!("{column} IS NULL"),
            Self::Only => format!("{column} IS NOT NULL"),
            Self::All => "TRUE".to_string(),
        }
    }

    /// Whether a row with the given deletion state is visible in this mode.
    pub fn includes(&self, deleted: bool) -> bool {
        match self {
            Self::None => !deleted,
            Self::Only => deleted,
            Self::All => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_includes() {
        assert!(TrashMode::None.includes(false));
        assert!(!TrashMode::None.includes(true));
        assert!(TrashMode::Only.includes(true));
        assert!(!TrashMode::Only.includes(false));
        assert!(TrashMode::All.includes(true));
    }

    #[test]
    fn test_sql_predicate() {
        assert_eq!(
            TrashMode::Only.sql_predicate("r.deleted_at"),
            "r.deleted_at IS NOT NULL"
        );
    }
}
