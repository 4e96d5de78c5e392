//! Pagination and trash query parameters.

use serde::{Deserialize, Serialize};
use validator::Validate;

use inkwell_core::types::{PageRequest, TrashMode};

/// `?page=&limit=&trashed=` accepted by list endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
    /// Soft-deleted rows to include; ignored by services without trash.
    #[serde(default)]
    pub trashed: TrashMode,
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            trashed: TrashMode::None,
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    PageRequest::default().limit
}
