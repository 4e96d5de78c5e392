//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;

/// `?page=&limit=` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number.
    #[serde(default = "first_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

impl PageRequest {
    /// Build a request, clamping both values into range.
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }.normalized()
    }

    /// The same request with `page >= 1` and `1 <= limit <= 100`.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) * self.limit) as i64
    }

    pub fn limit(&self) -> i64 {
        self.limit as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Page bookkeeping returned next to the items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub item_count: u64,
    pub total_items: u64,
    pub per_page: u64,
    pub total_pages: u64,
    pub current_page: u64,
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> PageResponse<T> {
    pub fn new(items: Vec<T>, request: &PageRequest, total_items: u64) -> Self {
        let per_page = request.limit.max(1);
        Self {
            meta: PageMeta {
                item_count: items.len() as u64,
                total_items,
                per_page,
                total_pages: total_items.div_ceil(per_page),
                current_page: request.page,
            },
            items,
        }
    }

    /// Slice an in-memory collection the same way a SQL query would.
    pub fn from_vec(all: Vec<T>, request: &PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit as usize)
            .collect();
        Self::new(items, request, total)
    }

    /// Convert every item, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

fn first_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_clamp() {
        let page = PageRequest::new(3, 500);
        assert_eq!(page.limit, MAX_LIMIT);
        assert_eq!(page.offset(), 200);
        assert_eq!(PageRequest::new(0, 0), PageRequest { page: 1, limit: 1 });
    }

    #[test]
    fn test_from_vec_slices_and_counts() {
        let resp = PageResponse::from_vec((1..=7).collect(), &PageRequest::new(2, 3));
        assert_eq!(resp.items, vec![4, 5, 6]);
        assert_eq!(resp.meta.total_pages, 3);
        assert_eq!(resp.meta.item_count, 3);
        let json = serde_json::to_value(resp.map(|n| n * 10)).unwrap();
        assert_eq!(json["meta"]["totalItems"], 7);
        assert_eq!(json["items"][0], 40);
    }
}
