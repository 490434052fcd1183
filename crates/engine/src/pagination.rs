//! Pagination
//!
//! Pages are 1-based. `offset = (page - 1) * per_page`, `limit = per_page`,
//! and `total_pages = ceil(total_entries / per_page)`. The total is counted
//! under the same conditions as the page itself, ignoring the window.

use std::ops::Deref;

use docmap_core::{Document, Error, Result};

use crate::query::FindOptions;

/// Options for a paginated find
#[derive(Debug, Clone, PartialEq)]
pub struct PaginateOptions {
    /// Field conditions
    pub conditions: Document,
    /// Order clause
    pub order: Option<String>,
    /// Page size; the configured default when `None`
    pub per_page: Option<usize>,
    /// 1-based page number
    pub page: usize,
}

impl Default for PaginateOptions {
    fn default() -> Self {
        Self {
            conditions: Document::new(),
            order: None,
            per_page: None,
            page: 1,
        }
    }
}

impl PaginateOptions {
    /// First page with the default page size
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the conditions
    pub fn conditions(mut self, conditions: Document) -> Self {
        self.conditions = conditions;
        self
    }

    /// Set the order clause
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Set the page size
    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Set the page number
    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }
}

/// Window arithmetic for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    per_page: usize,
    page: usize,
}

impl Pagination {
    /// Validate page size and number
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArguments` if either is zero.
    pub fn new(per_page: usize, page: usize) -> Result<Self> {
        if per_page == 0 {
            return Err(Error::InvalidArguments("per_page must be at least 1".to_string()));
        }
        if page == 0 {
            return Err(Error::InvalidArguments("page numbers start at 1".to_string()));
        }
        Ok(Self { per_page, page })
    }

    /// Page size
    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// 1-based page number
    pub fn page(&self) -> usize {
        self.page
    }

    /// Number of records before this page
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Pages needed for `total_entries`
    pub fn total_pages(&self, total_entries: u64) -> u64 {
        let per_page = self.per_page as u64;
        total_entries / per_page + u64::from(total_entries % per_page != 0)
    }

    /// Find options for this page's window
    pub fn window(&self, options: &PaginateOptions) -> FindOptions {
        FindOptions {
            conditions: options.conditions.clone(),
            order: options.order.clone(),
            limit: Some(self.per_page),
            offset: Some(self.offset()),
        }
    }
}

/// One page of results plus totals
///
/// Derefs to the slice of items on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    items: Vec<T>,
    total_entries: u64,
    total_pages: u64,
    current_page: usize,
    per_page: usize,
}

impl<T> Page<T> {
    /// Assemble a page
    pub fn new(items: Vec<T>, total_entries: u64, pagination: Pagination) -> Self {
        Self {
            items,
            total_entries,
            total_pages: pagination.total_pages(total_entries),
            current_page: pagination.page(),
            per_page: pagination.per_page(),
        }
    }

    /// Items on this page
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Take the items
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Matching records across all pages
    pub fn total_entries(&self) -> u64 {
        self.total_entries
    }

    /// Number of pages
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// 1-based number of this page
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Page size
    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Previous page number, if any
    pub fn previous_page(&self) -> Option<usize> {
        (self.current_page > 1).then(|| self.current_page - 1)
    }

    /// Next page number, if any
    pub fn next_page(&self) -> Option<usize> {
        ((self.current_page as u64) < self.total_pages).then(|| self.current_page + 1)
    }
}

impl<T> Deref for Page<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}
