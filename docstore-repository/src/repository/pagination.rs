//! Pagination parameters for repository queries
//!
//! # Example
//!
//! ```rust
//! use docstore_repository::repository::Pagination;
//!
//! let page = Pagination::page(3, 20);
//! assert_eq!(page.offset, 40);
//! assert_eq!(page.limit, 20);
//! ```

/// Pagination parameters for limiting query results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of results to skip
    pub offset: u64,
    /// Maximum number of results to return
    pub limit: u64,
}

impl Pagination {
    /// Create new pagination parameters
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Create pagination for the first page with the given limit
    #[must_use]
    pub const fn first_page(limit: u64) -> Self {
        Self { offset: 0, limit }
    }

    /// Create pagination for a specific page number (1-indexed)
    ///
    /// Page `0` is treated as page `1`.
    #[must_use]
    pub const fn page(page_number: u64, page_size: u64) -> Self {
        let offset = page_number.saturating_sub(1).saturating_mul(page_size);
        Self {
            offset,
            limit: page_size,
        }
    }

    /// Apply the window to an iterator of results
    pub(crate) fn apply<I: Iterator>(self, items: I) -> impl Iterator<Item = I::Item> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        items.skip(offset).take(limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_first_page() {
        let pagination = Pagination::first_page(50);
        assert_eq!(pagination.offset, 0);
        assert_eq!(pagination.limit, 50);
    }

    #[test]
    fn test_pagination_page() {
        assert_eq!(Pagination::page(1, 20), Pagination::new(0, 20));
        assert_eq!(Pagination::page(3, 20), Pagination::new(40, 20));
    }

    #[test]
    fn test_pagination_page_zero_handling() {
        assert_eq!(Pagination::page(0, 20).offset, 0);
    }

    #[test]
    fn test_pagination_default() {
        assert_eq!(Pagination::default(), Pagination::new(0, 20));
    }

    #[test]
    fn test_pagination_apply_window() {
        let window: Vec<_> = Pagination::new(2, 3).apply(0..10).collect();
        assert_eq!(window, vec![2, 3, 4]);

        let past_end: Vec<_> = Pagination::new(20, 3).apply(0..10).collect();
        assert!(past_end.is_empty());
    }
}
