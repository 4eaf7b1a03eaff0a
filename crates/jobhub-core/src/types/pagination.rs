//! Limit/offset pagination types for list queries.

use serde::{Deserialize, Serialize};

/// Default page size.
const DEFAULT_LIMIT: u64 = 100;

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Maximum number of items to return.
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Number of matching items to skip.
    #[serde(default)]
    pub offset: u64,
}

impl PageRequest {
    /// Create a new page request. A zero limit is raised to one.
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit: limit.max(1),
            offset,
        }
    }

    /// Return the SQL `OFFSET` value.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Return the SQL `LIMIT` value.
    pub fn limit(&self) -> u64 {
        self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total number of matching items, ignoring limit and offset.
    pub total_count: u64,
    /// Limit the page was requested with.
    pub limit: u64,
    /// Offset the page was requested with.
    pub offset: u64,
}

impl<T> PageResponse<T> {
    /// Create a new paginated response.
    pub fn new(items: Vec<T>, page: &PageRequest, total_count: u64) -> Self {
        Self {
            items,
            total_count,
            limit: page.limit,
            offset: page.offset,
        }
    }

    /// Create an empty response.
    pub fn empty(page: &PageRequest) -> Self {
        Self::new(Vec::new(), page, 0)
    }

    /// Whether matches exist beyond this page.
    pub fn has_more(&self) -> bool {
        self.offset + (self.items.len() as u64) < self.total_count
    }

    /// Convert every item, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_more() {
        let page = PageRequest::new(2, 0);
        let response = PageResponse::new(vec![1, 2], &page, 5);
        assert!(response.has_more());

        let page = PageRequest::new(2, 4);
        let response = PageResponse::new(vec![5], &page, 5);
        assert!(!response.has_more());
    }

    #[test]
    fn test_zero_limit_is_raised() {
        assert_eq!(PageRequest::new(0, 3).limit(), 1);
    }
}
