//! Shared types used across the build pipeline.
//!
//! These are read from the archive store and flow through pagination,
//! rendering, and feed emission unchanged. All of them are immutable once
//! fetched — the build never writes back to the archive.

use chrono::{DateTime, Utc};

/// One month of archived history. Identifies a page group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Month {
    pub year: i32,
    /// 1-based calendar month.
    pub month: u32,
    /// `YYYY-MM`, used as the page filename stem and in navigation.
    pub slug: String,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            slug: format!("{year:04}-{month:02}"),
        }
    }
}

/// Per-day message count within a month, used for in-page day navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    /// `YYYY-MM-DD`, doubles as the in-page anchor for the day.
    pub slug: String,
    pub date: DateTime<Utc>,
    pub count: u64,
}

/// Author of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// Media attached to a message.
///
/// `url` is either a filename relative to the configured media directory or
/// a full remote URL (scheme included) for media that was never downloaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Media {
    pub url: Option<String>,
    pub title: Option<String>,
}

/// A single archived message.
///
/// `id` is monotonic and unique across the whole corpus; it is both the
/// ordering key and the keyset-pagination cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub user: User,
    pub content: Option<String>,
    /// Id of the message this one replies to, if any. The target may fall
    /// outside the archived range.
    pub reply_to: Option<i64>,
    pub media: Option<Media>,
}

/// Metadata about the archived chat, fetched once per build and passed
/// through to templates verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInfo {
    pub id: i64,
    pub title: Option<String>,
    pub username: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
}
