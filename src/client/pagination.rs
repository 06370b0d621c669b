//! Offset pagination for API Manager listings
//!
//! The asset listing does not report reliable totals, so callers keep
//! requesting pages until one comes back shorter than the page size.

use std::future::Future;

use log::debug;

use crate::error::Result;

/// Default assets per page
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Offset/limit pair for a listing request.
///
/// # Example
/// ```ignore
/// let page = PageParams::new(50).offset(100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    /// Index of the first item
    pub offset: usize,
    /// Maximum number of items in the page
    pub limit: usize,
}

impl Default for PageParams {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageParams {
    /// First page with the given size
    pub fn new(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// Set the starting offset.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Parameters for the page after this one
    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }

    /// A page is the last one when it holds fewer than `limit` items.
    pub fn is_last(&self, returned: usize) -> bool {
        returned < self.limit
    }

    /// Query string parameters in API Manager naming
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("offset", self.offset.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

/// Walk pages in order, handing each page's items to `on_page`.
///
/// Stops after the first short page. `fetch_page` errors abort the walk.
/// Returns the number of items seen.
pub async fn for_each_page<T, F, Fut, H, HFut>(
    first: PageParams,
    mut fetch_page: F,
    mut on_page: H,
) -> Result<usize>
where
    F: FnMut(PageParams) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
    H: FnMut(Vec<T>) -> HFut,
    HFut: Future<Output = ()>,
{
    let mut page = first;
    let mut seen = 0;

    loop {
        let items = fetch_page(page).await?;
        let returned = items.len();
        debug!(
            "Page at offset {} returned {} items (limit {})",
            page.offset, returned, page.limit
        );
        seen += returned;
        on_page(items).await;

        if page.is_last(returned) {
            break;
        }
        page = page.next();
    }

    Ok(seen)
}
