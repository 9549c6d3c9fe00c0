//! Pagination of a month's messages into fixed-size pages.
//!
//! Pages are cut with keyset pagination: the cursor is the last message id
//! seen, and each fetch asks the store for messages strictly after it. This
//! keeps page boundaries stable regardless of how many rows a month has and
//! never skips or duplicates a message.
//!
//! ## Filename convention
//!
//! Page filenames derive from the month slug:
//! - page 1 of `2024-01` → `2024-01.html`
//! - page 2 → `2024-01_2.html`
//!
//! [`PageIndex`] records which page every rendered message landed on, so
//! reply links can point at parent messages on arbitrary pages across the
//! whole corpus.

use std::collections::HashMap;

use crate::store::{Storage, StoreError};
use crate::types::{Message, Month};

/// Output filename for one page of a month.
pub fn page_filename(slug: &str, page: u32) -> String {
    if page > 1 {
        format!("{slug}_{page}.html")
    } else {
        format!("{slug}.html")
    }
}

/// Number of pages a month with `total` messages produces.
///
/// Display metadata only — the paginator itself stops on an empty fetch.
pub fn total_pages(total: u64, page_size: u32) -> u64 {
    total.div_ceil(page_size as u64)
}

/// One fetched page: its 1-based number, output filename, and messages.
#[derive(Debug)]
pub struct PageBatch {
    pub page: u32,
    pub filename: String,
    pub messages: Vec<Message>,
}

/// Walks one month's messages in fixed-size pages.
///
/// The cursor starts at 0 and advances to the last id of each batch; a
/// month with zero messages yields no batches at all.
pub struct Paginator<'a, S: Storage + ?Sized> {
    store: &'a S,
    year: i32,
    month: u32,
    slug: String,
    page_size: u32,
    cursor: i64,
    page: u32,
}

impl<'a, S: Storage + ?Sized> Paginator<'a, S> {
    pub fn new(store: &'a S, month: &Month, page_size: u32) -> Self {
        Self {
            store,
            year: month.year,
            month: month.month,
            slug: month.slug.clone(),
            page_size,
            cursor: 0,
            page: 0,
        }
    }

    /// Fetch the next page, or `None` once the month is exhausted.
    pub fn next_batch(&mut self) -> Result<Option<PageBatch>, StoreError> {
        let messages =
            self.store
                .get_messages(self.year, self.month, self.cursor, self.page_size)?;
        let Some(last) = messages.last() else {
            return Ok(None);
        };
        self.cursor = last.id;
        self.page += 1;
        Ok(Some(PageBatch {
            page: self.page,
            filename: page_filename(&self.slug, self.page),
            messages,
        }))
    }
}

/// Map from message id to the page filename containing it.
///
/// Built incrementally as pages are generated and consulted during rendering
/// to resolve reply links. Ids are unique across the corpus, so every entry
/// is effectively write-once for the lifetime of a build.
#[derive(Debug, Default)]
pub struct PageIndex {
    pages: HashMap<i64, String>,
}

impl PageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `id` was rendered into `filename`.
    pub fn record(&mut self, id: i64, filename: &str) {
        self.pages.insert(id, filename.to_string());
    }

    /// Page filename for `id`, or `None` for messages outside the archived
    /// range. Callers must render absence gracefully, never fail on it.
    pub fn lookup(&self, id: i64) -> Option<&str> {
        self.pages.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
