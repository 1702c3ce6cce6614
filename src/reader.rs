use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::item::Cursor;
use crate::retry::RetryPolicy;
use crate::store::{ScanPage, TableStore};

/// Items requested per page read
pub const PAGE_SIZE: i32 = 25;

/// Reads one table page by page, following the store's continuation cursor
#[derive(Clone)]
pub struct PageReader {
    store: Arc<dyn TableStore>,
    table: String,
    page_size: i32,
    retry: Option<RetryPolicy>,
}

impl fmt::Debug for PageReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageReader")
            .field("table", &self.table)
            .field("page_size", &self.page_size)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl PageReader {
    /// Reader over `table` with the standard page size and no retries of its own
    pub fn new(store: Arc<dyn TableStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            page_size: PAGE_SIZE,
            retry: None,
        }
    }

    /// Retry failed reads with `policy` before giving up
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Table being read
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Read the page that starts after `cursor`; `None` starts the table.
    ///
    /// The returned page's cursor is `None` once the table is exhausted.
    pub async fn read(&self, cursor: Option<Cursor>) -> Result<ScanPage> {
        let page = match &self.retry {
            None => {
                self.store
                    .scan_page(&self.table, cursor, self.page_size)
                    .await?
            }
            Some(policy) => {
                policy
                    .run(|_| {
                        self.store
                            .scan_page(&self.table, cursor.clone(), self.page_size)
                    })
                    .await?
            }
        };

        debug!(
            table = %self.table,
            items = page.items.len(),
            consumed_capacity = page.consumed_capacity.unwrap_or(0.0),
            more = page.cursor.is_some(),
            "scanned page"
        );

        Ok(page)
    }
}
