//! Paginación de listados.
//!
//! `offset = (page - 1) * limit`, `total_pages = ceil(total / limit)`.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: DEFAULT_PAGE_LIMIT }
    }
}

impl PageRequest {
    /// Normaliza: `page >= 1`, `1 <= limit <= MAX_PAGE_LIMIT`.
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page: page.max(1), limit: limit.clamp(1, MAX_PAGE_LIMIT) }
    }

    pub fn offset(&self) -> u64 {
        (self.page.max(1) as u64 - 1) * self.limit as u64
    }

    pub fn total_pages(&self, total_count: u64) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        total_count.div_ceil(self.limit as u64)
    }

    pub fn has_next_page(&self, total_count: u64) -> bool {
        (self.page as u64) * (self.limit as u64) < total_count
    }

    pub fn has_prev_page(&self) -> bool {
        self.page > 1
    }
}

/// Sobre de paginación devuelto por los listados de envíos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPage<T> {
    pub submissions: Vec<T>,
    pub total_count: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl<T> SubmissionPage<T> {
    pub fn new(submissions: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self { submissions,
               total_count,
               total_pages: request.total_pages(total_count),
               has_next_page: request.has_next_page(total_count),
               has_prev_page: request.has_prev_page() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_and_totals() {
        let req = PageRequest::new(2, 10);
        assert_eq!(req.offset(), 10);
        assert_eq!(req.total_pages(25), 3);
        assert_eq!(req.total_pages(30), 3);
        assert_eq!(req.total_pages(0), 0);
        assert!(req.has_next_page(25));
        assert!(!req.has_next_page(20));
        assert!(req.has_prev_page());
        assert!(!PageRequest::new(1, 10).has_prev_page());
    }

    #[test]
    fn clamps_out_of_range_requests() {
        assert_eq!(PageRequest::new(0, 0), PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::new(3, 5000).limit, MAX_PAGE_LIMIT);
        assert_eq!(PageRequest::default(), PageRequest { page: 1, limit: DEFAULT_PAGE_LIMIT });
    }

    #[test]
    fn next_and_prev_follow_the_page_window() {
        for total in [0u64, 1, 9, 10, 11, 99, 100, 101] {
            for page in 1..=12u32 {
                for limit in [1u32, 3, 10, 25] {
                    let req = PageRequest::new(page, limit);
                    assert_eq!(req.has_next_page(total), (page as u64) * (limit as u64) < total);
                    assert_eq!(req.has_prev_page(), page > 1);
                }
            }
        }
    }

    #[test]
    fn envelope_uses_camel_case_keys() {
        let page = SubmissionPage::new(vec![1, 2], 12, PageRequest::new(1, 2));
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalCount"], 12);
        assert_eq!(json["totalPages"], 6);
        assert_eq!(json["hasNextPage"], true);
        assert_eq!(json["hasPrevPage"], false);
        assert_eq!(json["submissions"].as_array().unwrap().len(), 2);
    }
}
