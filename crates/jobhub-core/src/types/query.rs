//! Combined sort, filter, and pagination request for list queries.

use serde::{Deserialize, Serialize};

use super::filter::FilterField;
use super::pagination::PageRequest;
use super::sorting::SortField;

/// Generic list request handed to a store's `find_all`.
///
/// Filters are combined with logical AND, in order. Sort keys apply in
/// order; an empty list means the store's default ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SortAndFilterRequest {
    /// Sort keys, most significant first.
    #[serde(default)]
    pub sorts: Vec<SortField>,
    /// Conditions every returned item satisfies.
    #[serde(default)]
    pub filters: Vec<FilterField>,
    /// Page window.
    #[serde(default)]
    pub page: PageRequest,
}

impl SortAndFilterRequest {
    /// Add a filter condition.
    pub fn with_filter(mut self, filter: FilterField) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a sort key.
    pub fn with_sort(mut self, sort: SortField) -> Self {
        self.sorts.push(sort);
        self
    }

    /// Replace the page window.
    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }
}
