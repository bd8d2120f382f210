//! Page-number pagination shared by store queries and in-memory slicing.

use serde::{Deserialize, Serialize};

/// One-based page request. A `page_size` of zero means "everything, unpaged".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub const fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    pub const fn unpaged() -> Self {
        Self {
            page: 1,
            page_size: 0,
        }
    }

    pub const fn is_unpaged(&self) -> bool {
        self.page_size == 0
    }

    /// Page zero is treated as the first page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    /// Slice `items` to this page, clamped to bounds.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        if self.is_unpaged() {
            return items;
        }

        let Ok(start) = usize::try_from(self.offset()) else {
            return &[];
        };
        if start >= items.len() {
            return &[];
        }
        let end = start.saturating_add(self.page_size as usize).min(items.len());
        &items[start..end]
    }
}

/// A page of results together with the total number of matching items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpaged_request_returns_everything() {
        let items = [1, 2, 3];
        assert_eq!(PageRequest::unpaged().slice(&items), &[1, 2, 3]);
        assert_eq!(PageRequest::new(4, 0).slice(&items), &[1, 2, 3]);
    }

    #[test]
    fn slices_are_clamped_to_bounds() {
        let items = [1, 2, 3, 4, 5];
        assert_eq!(PageRequest::new(1, 2).slice(&items), &[1, 2]);
        assert_eq!(PageRequest::new(3, 2).slice(&items), &[5]);
        assert!(PageRequest::new(4, 2).slice(&items).is_empty());
    }

    #[test]
    fn page_zero_behaves_like_first_page() {
        let request = PageRequest::new(0, 10);
        assert_eq!(request.offset(), 0);
        assert_eq!(request.limit(), 10);
    }
}
