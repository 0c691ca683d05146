//! Refinement spec, pagination metadata and result sets

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default number of records per page
pub const DEFAULT_PER_PAGE: usize = 25;

/// Upper bound for a request-supplied page size
pub const DEFAULT_MAX_PER_PAGE: usize = 100;

/// Sort direction; anything unrecognised reads as ascending
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Lenient parse: `desc` (any case) is descending, everything else ascending
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }
}

/// Field plus direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

impl OrderSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Requested page. `number` is 1-based and deliberately signed so that
/// out-of-range requests survive parsing and produce an empty page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    pub number: i64,
    #[serde(default)]
    pub per_page: Option<usize>,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            number: 1,
            per_page: None,
        }
    }
}

/// Per-request bundle of refinement instructions.
///
/// Filter values stay raw here; the pipeline parses them against each
/// field's declared type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefinementSpec {
    #[serde(default)]
    pub filter: IndexMap<String, String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub order: Option<OrderSpec>,
    #[serde(default)]
    pub page: PageSpec,
}

impl RefinementSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter.insert(field.into(), value.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_order(mut self, order: OrderSpec) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_page(mut self, number: i64) -> Self {
        self.page.number = number;
        self
    }

    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.page.per_page = Some(per_page);
        self
    }
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    /// Requested page number (1-based, echoed even when out of range)
    pub page: i64,

    /// Number of items per page
    pub per_page: usize,

    /// Total number of items (after scope and filters)
    pub total: usize,

    /// Total number of pages
    pub total_pages: usize,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create pagination metadata from calculation
    pub fn new(page: i64, per_page: usize, total: usize) -> Self {
        // Ensure per_page is at least 1 to avoid division by zero
        let per_page = per_page.max(1);
        let total_pages = total.div_ceil(per_page);
        let in_range = page >= 1 && (page as u64) <= total_pages as u64;

        Self {
            page,
            per_page,
            total,
            total_pages,
            has_next: in_range && (page as usize) < total_pages,
            has_prev: in_range && page > 1,
        }
    }

    /// Whether the requested page lies within `1..=total_pages`
    pub fn in_range(&self) -> bool {
        self.page >= 1 && (self.page as u64) <= self.total_pages as u64
    }
}

/// One page of refined records
#[derive(Debug, Clone, Serialize)]
pub struct ResultSet<T> {
    /// The paginated data
    pub items: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,

    /// Scope that was actually applied (the default one when none was requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl<T> ResultSet<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Transform the items, keeping the metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ResultSet<U> {
        ResultSet {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
            scope: self.scope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse_is_lenient() {
        assert_eq!(Direction::parse("desc"), Direction::Desc);
        assert_eq!(Direction::parse("DESC"), Direction::Desc);
        assert_eq!(Direction::parse("asc"), Direction::Asc);
        assert_eq!(Direction::parse("sideways"), Direction::Asc);
    }

    #[test]
    fn test_refinement_defaults() {
        let spec = RefinementSpec::default();
        assert!(spec.filter.is_empty());
        assert_eq!(spec.scope, None);
        assert_eq!(spec.order, None);
        assert_eq!(spec.page.number, 1);
        assert_eq!(spec.page.per_page, None);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(1, 20, 145);
        assert_eq!(meta.total, 145);
        assert_eq!(meta.total_pages, 8);
        assert!(!meta.has_prev);
        assert!(meta.has_next);
    }

    #[test]
    fn test_pagination_meta_last_page() {
        let meta = PaginationMeta::new(8, 20, 145);
        assert!(meta.has_prev);
        assert!(!meta.has_next);
    }

    #[test]
    fn test_pagination_meta_out_of_range() {
        let meta = PaginationMeta::new(0, 10, 30);
        assert!(!meta.in_range());
        assert!(!meta.has_next);
        assert!(!meta.has_prev);

        let meta = PaginationMeta::new(4, 10, 30);
        assert!(!meta.in_range());
    }

    #[test]
    fn test_pagination_meta_empty_collection() {
        let meta = PaginationMeta::new(1, 25, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.in_range());
    }
}
