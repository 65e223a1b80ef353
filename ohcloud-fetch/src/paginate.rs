//! Bounded pagination over continuation tokens.
//!
//! [`paginate`] keeps calling a page function with the token returned by the
//! previous page until the server stops returning a token, a page comes back
//! empty, or one of the caller's [`PageLimits`] is reached. There is no way
//! to paginate without a page bound.

use std::future::Future;

use tracing::debug;

// ============================================================================
// Limits
// ============================================================================

/// Caller-chosen upper bounds for a paginated read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    max_pages: usize,
    max_items: Option<usize>,
}

impl PageLimits {
    /// Limits iteration to `max_pages` pages.
    pub fn pages(max_pages: usize) -> Self {
        Self {
            max_pages,
            max_items: None,
        }
    }

    /// Also limits the number of collected items.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Sets the item limit if one is given.
    pub fn with_max_items_opt(mut self, max_items: Option<usize>) -> Self {
        self.max_items = max_items;
        self
    }

    /// Maximum number of pages.
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Maximum number of items, if bounded.
    pub fn max_items(&self) -> Option<usize> {
        self.max_items
    }
}

// ============================================================================
// Page / Result
// ============================================================================

/// One page returned by the page function.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Continuation token for the next page.
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// Creates a page.
    pub fn new(items: Vec<T>, next: Option<String>) -> Self {
        Self { items, next }
    }

    /// Creates the last page.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Why pagination stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationEnd {
    /// The server returned no token or an empty page.
    Exhausted,
    /// The page bound was reached.
    PageLimit,
    /// The item bound was reached.
    ItemLimit,
}

/// Collected items and how iteration ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    /// All collected items, in server order.
    pub items: Vec<T>,
    /// Number of pages requested.
    pub pages: usize,
    /// Stop reason.
    pub end: PaginationEnd,
}

impl<T> Paginated<T> {
    /// Returns true if the server had more data than was collected.
    pub fn is_truncated(&self) -> bool {
        self.end != PaginationEnd::Exhausted
    }
}

// ============================================================================
// Paginate
// ============================================================================

/// Collects pages until exhaustion or a limit.
///
/// `fetch_page` receives the continuation token (`None` for the first page
/// unless `first` is given). Errors are returned as-is; items already
/// collected are discarded.
pub async fn paginate<T, E, F, Fut>(
    limits: PageLimits,
    first: Option<String>,
    mut fetch_page: F,
) -> Result<Paginated<T>, E>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut items = Vec::new();
    let mut pages = 0;
    let mut token = first;

    if limits.max_items == Some(0) {
        return Ok(Paginated {
            items,
            pages,
            end: PaginationEnd::ItemLimit,
        });
    }

    loop {
        if pages >= limits.max_pages {
            debug!(pages, "Page limit reached");
            return Ok(Paginated {
                items,
                pages,
                end: PaginationEnd::PageLimit,
            });
        }

        let page = fetch_page(token.take()).await?;
        pages += 1;

        let page_len = page.items.len();
        items.extend(page.items);

        if let Some(max) = limits.max_items {
            if items.len() >= max {
                items.truncate(max);
                debug!(pages, items = max, "Item limit reached");
                return Ok(Paginated {
                    items,
                    pages,
                    end: PaginationEnd::ItemLimit,
                });
            }
        }

        match page.next {
            Some(next) if page_len > 0 && !next.is_empty() => token = Some(next),
            _ => {
                return Ok(Paginated {
                    items,
                    pages,
                    end: PaginationEnd::Exhausted,
                });
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
