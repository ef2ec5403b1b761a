//! Pagination envelopes for listing endpoints.

use serde::{Deserialize, Serialize};

/// Position of a page within a larger result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page_size: u32,
    pub current_page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_count: u64,
}

impl Pagination {
    /// A request for page `current_page` (1-based) of `page_size` items.
    #[must_use]
    pub fn request(current_page: u32, page_size: u32) -> Self {
        Self {
            page_size,
            current_page: current_page.max(1),
            total_pages: 0,
            total_count: 0,
        }
    }

    /// Zero-based offset of the first item on this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.current_page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// One page of results together with its pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPage<T> {
    pub pagination: Pagination,
    pub page: Vec<T>,
}

impl<T> DataPage<T> {
    #[must_use]
    pub fn new(pagination: Pagination, page: Vec<T>) -> Self {
        Self { pagination, page }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.page.is_empty()
    }
}
