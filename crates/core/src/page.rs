//! Offset pagination: validated windows and the metadata returned with a page.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Page size used when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Errors for pagination parameters that cannot be executed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationError {
    /// The limit is zero or negative.
    #[error("limit must be at least 1 (got {0})")]
    InvalidLimit(i64),
    /// The offset is negative.
    #[error("offset must not be negative (got {0})")]
    NegativeOffset(i64),
}

/// A validated `LIMIT`/`OFFSET` pair.
///
/// A window never carries a non-positive limit, so it can't be mistaken for
/// an unbounded fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    limit: i64,
    offset: i64,
}

impl PageWindow {
    /// Validate a limit and offset.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::InvalidLimit`] if `limit < 1` and
    /// [`PaginationError::NegativeOffset`] if `offset < 0`.
    pub const fn new(limit: i64, offset: i64) -> Result<Self, PaginationError> {
        if limit < 1 {
            return Err(PaginationError::InvalidLimit(limit));
        }
        if offset < 0 {
            return Err(PaginationError::NegativeOffset(offset));
        }
        Ok(Self { limit, offset })
    }

    /// Maximum number of items in the page.
    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.limit
    }

    /// Number of items skipped before the page.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        self.offset
    }
}

/// Offset of a 0-indexed page number.
#[must_use]
pub const fn page_offset(page: i64, limit: i64) -> i64 {
    page.saturating_mul(limit)
}

/// Listing order for coffee and tag names.
///
/// ASCII case is ignored first, then exact bytes break the tie. SQL stores
/// render the same order with `lower(name COLLATE "C"), name COLLATE "C"`,
/// so results do not depend on the database collation.
#[must_use]
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|byte| byte.to_ascii_lowercase())
        .cmp(b.bytes().map(|byte| byte.to_ascii_lowercase()))
        .then_with(|| a.cmp(b))
}

/// A page of items plus the unpaginated count of everything that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items in this page.
    pub items: Vec<T>,
    /// Total number of matches across all pages.
    pub total: i64,
}

impl<T> Page<T> {
    /// A page with no items and a zero total.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

/// Pagination metadata returned with search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Total number of matches.
    pub total: i64,
    /// 0-indexed page number (`offset / limit`).
    pub page: i64,
    /// Page size.
    pub page_size: i64,
    /// `ceil(total / limit)`.
    pub total_pages: i64,
    /// Whether `offset + limit < total`.
    pub has_more: bool,
}

impl Pagination {
    /// Compute the metadata for a window over `total` matches.
    #[must_use]
    pub const fn new(total: i64, window: PageWindow) -> Self {
        let limit = window.limit();
        let offset = window.offset();
        let total_pages = if total <= 0 { 0 } else { (total - 1) / limit + 1 };

        Self {
            total,
            page: offset / limit,
            page_size: limit,
            total_pages,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

/// The search response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult<T> {
    /// Items of the requested page, in result order.
    pub data: Vec<T>,
    /// Pagination metadata.
    pub pagination: Pagination,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_names_compare_case_insensitively_first() {
        let mut names = vec!["espresso lungo", "Latte", "americano", "Espresso", "espresso"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(
            names,
            ["americano", "Espresso", "espresso", "espresso lungo", "Latte"]
        );
        assert_eq!(compare_names("Mocha", "Mocha"), Ordering::Equal);
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert_eq!(PageWindow::new(0, 0), Err(PaginationError::InvalidLimit(0)));
        assert_eq!(
            PageWindow::new(-5, 0),
            Err(PaginationError::InvalidLimit(-5))
        );
    }

    #[test]
    fn test_negative_offset_rejected() {
        assert_eq!(
            PageWindow::new(10, -1),
            Err(PaginationError::NegativeOffset(-1))
        );
    }

    #[test]
    fn test_error_names_the_value() {
        assert_eq!(
            PaginationError::InvalidLimit(0).to_string(),
            "limit must be at least 1 (got 0)"
        );
    }

    #[test]
    fn test_middle_page() {
        let pagination = Pagination::new(3, PageWindow::new(1, 1).unwrap());
        assert_eq!(pagination.page, 1);
        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_more);
    }

    #[test]
    fn test_last_page_has_no_more() {
        let pagination = Pagination::new(3, PageWindow::new(1, 2).unwrap());
        assert_eq!(pagination.page, 2);
        assert!(!pagination.has_more);
    }

    #[test]
    fn test_empty_result() {
        let pagination = Pagination::new(0, PageWindow::new(10, 0).unwrap());
        assert_eq!(pagination.total, 0);
        assert_eq!(pagination.total_pages, 0);
        assert!(!pagination.has_more);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let window = PageWindow::new(10, 0).unwrap();
        assert_eq!(Pagination::new(1, window).total_pages, 1);
        assert_eq!(Pagination::new(10, window).total_pages, 1);
        assert_eq!(Pagination::new(11, window).total_pages, 2);
    }

    #[test]
    fn test_has_more_boundary() {
        // offset + limit == total means this is the last page.
        assert!(!Pagination::new(20, PageWindow::new(10, 10).unwrap()).has_more);
        assert!(Pagination::new(21, PageWindow::new(10, 10).unwrap()).has_more);
    }

    #[test]
    fn test_offset_not_aligned_to_page() {
        let pagination = Pagination::new(30, PageWindow::new(10, 15).unwrap());
        assert_eq!(pagination.page, 1);
        assert!(pagination.has_more);
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(0, 10), 0);
        assert_eq!(page_offset(3, 10), 30);
        assert_eq!(page_offset(i64::MAX, 10), i64::MAX);
    }

    #[test]
    fn test_pagination_serializes_camel_case() {
        let json = serde_json::to_value(Pagination::new(3, PageWindow::new(1, 1).unwrap())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "total": 3,
                "page": 1,
                "pageSize": 1,
                "totalPages": 3,
                "hasMore": true
            })
        );
    }
}
