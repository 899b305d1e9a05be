use serde::Serialize;

/// Page descriptor for a listing: the page being shown and the last page
/// that exists. Computed from the total matching row count, never from the
/// number of rows actually returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current: u64,
    pub last: u64,
}

impl Pagination {
    /// An empty listing still has one (empty) page, so `last` is never zero.
    #[must_use]
    pub fn from_total(current: u64, total: u64, per_page: u64) -> Self {
        Self {
            current,
            last: total.div_ceil(per_page).max(1),
        }
    }

    #[must_use]
    pub const fn previous(&self) -> Option<u64> {
        if self.current > 1 {
            Some(self.current - 1)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn next(&self) -> Option<u64> {
        if self.current < self.last {
            Some(self.current + 1)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_listing_still_has_one_page() {
        let pages = Pagination::from_total(1, 0, 25);
        assert_eq!(pages.last, 1);
        assert_eq!(pages.previous(), None);
        assert_eq!(pages.next(), None);
    }

    #[test]
    fn test_partial_last_page_rounds_up() {
        assert_eq!(Pagination::from_total(1, 26, 25).last, 2);
        assert_eq!(Pagination::from_total(1, 50, 25).last, 2);
        assert_eq!(Pagination::from_total(1, 51, 25).last, 3);
    }

    #[test]
    fn test_cursors_at_interior_page() {
        let pages = Pagination::from_total(2, 60, 25);
        assert_eq!(pages.previous(), Some(1));
        assert_eq!(pages.next(), Some(3));
    }

    #[test]
    fn test_cursors_at_boundaries() {
        let pages = Pagination::from_total(1, 60, 25);
        assert_eq!(pages.previous(), None);
        assert_eq!(pages.next(), Some(2));

        let pages = Pagination::from_total(3, 60, 25);
        assert_eq!(pages.previous(), Some(2));
        assert_eq!(pages.next(), None);
    }
}
