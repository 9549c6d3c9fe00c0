//! Archive storage layer.
//!
//! The build consumes a pre-aggregated message archive through the
//! [`Storage`] trait; [`SqliteStore`] is the production implementation,
//! reading the SQLite database produced by the archiver. The store is
//! strictly read-only — ingestion and schema management are not this
//! crate's concern.
//!
//! ## Expected tables
//!
//! ```sql
//! users     (id INTEGER PRIMARY KEY, username TEXT NOT NULL)
//! media     (id INTEGER PRIMARY KEY, url TEXT, title TEXT)
//! messages  (id INTEGER PRIMARY KEY, date TEXT NOT NULL, content TEXT,
//!            reply_to INTEGER, user_id INTEGER, media_id INTEGER)
//! chat_info (id INTEGER PRIMARY KEY, title TEXT, username TEXT,
//!            archived_at TEXT)
//! ```
//!
//! Dates are RFC 3339 text. Message ids are monotonic and unique across the
//! whole corpus, which is what makes keyset pagination (`id > cursor`)
//! correct.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use thiserror::Error;

use crate::types::{ChatInfo, DaySummary, Media, Message, Month, User};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("malformed month slug in archive: {0}")]
    MalformedSlug(String),
}

/// Query interface the site builder consumes.
///
/// All sequences are returned in ascending chronological/id order; batches
/// from [`get_messages`](Storage::get_messages) are at most `limit` long.
pub trait Storage {
    /// Every month with at least one archived message, ascending.
    fn get_timeline(&self) -> Result<Vec<Month>, StoreError>;

    /// Per-day message counts for one month, ascending by day.
    fn get_dayline(&self, year: i32, month: u32) -> Result<Vec<DaySummary>, StoreError>;

    /// Total number of messages in one month.
    fn get_message_count(&self, year: i32, month: u32) -> Result<u64, StoreError>;

    /// Up to `limit` messages of the month with id strictly greater than
    /// `after_id`, ascending by id.
    fn get_messages(
        &self,
        year: i32,
        month: u32,
        after_id: i64,
        limit: u32,
    ) -> Result<Vec<Message>, StoreError>;

    /// Metadata of the most recent archiver run, if recorded.
    fn get_last_archived_chat_info(&self) -> Result<Option<ChatInfo>, StoreError>;
}

/// Read-only SQLite-backed [`Storage`] implementation.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an existing archive database read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Wrap an already-open connection. Used by tests to seed fixtures.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    fn parse_datetime(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| s.parse::<DateTime<Utc>>())
    }

    /// Column accessor that surfaces bad date text as a conversion error
    /// instead of panicking inside the row mapper.
    fn date_column(
        row: &rusqlite::Row<'_>,
        idx: usize,
    ) -> Result<DateTime<Utc>, rusqlite::Error> {
        let raw: String = row.get(idx)?;
        Self::parse_datetime(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
    }
}

impl Storage for SqliteStore {
    fn get_timeline(&self) -> Result<Vec<Month>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT strftime('%Y-%m', date) FROM messages ORDER BY 1")?;
        let slugs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        slugs
            .into_iter()
            .map(|slug| {
                let (y, m) = slug
                    .split_once('-')
                    .ok_or_else(|| StoreError::MalformedSlug(slug.clone()))?;
                let year: i32 = y
                    .parse()
                    .map_err(|_| StoreError::MalformedSlug(slug.clone()))?;
                let month: u32 = m
                    .parse()
                    .map_err(|_| StoreError::MalformedSlug(slug.clone()))?;
                Ok(Month::new(year, month))
            })
            .collect()
    }

    fn get_dayline(&self, year: i32, month: u32) -> Result<Vec<DaySummary>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT strftime('%Y-%m-%d', date), MIN(date), COUNT(*)
             FROM messages
             WHERE strftime('%Y-%m', date) = ?1
             GROUP BY 1 ORDER BY 1",
        )?;
        let slug = format!("{year:04}-{month:02}");
        let days = stmt
            .query_map(params![slug], |row| {
                Ok(DaySummary {
                    slug: row.get(0)?,
                    date: Self::date_column(row, 1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(days)
    }

    fn get_message_count(&self, year: i32, month: u32) -> Result<u64, StoreError> {
        let slug = format!("{year:04}-{month:02}");
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE strftime('%Y-%m', date) = ?1",
            params![slug],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn get_messages(
        &self,
        year: i32,
        month: u32,
        after_id: i64,
        limit: u32,
    ) -> Result<Vec<Message>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT m.id, m.date, m.content, m.reply_to,
                    u.id, u.username,
                    m.media_id, md.url, md.title
             FROM messages m
             LEFT JOIN users u ON u.id = m.user_id
             LEFT JOIN media md ON md.id = m.media_id
             WHERE strftime('%Y-%m', m.date) = ?1 AND m.id > ?2
             ORDER BY m.id LIMIT ?3",
        )?;
        let slug = format!("{year:04}-{month:02}");
        let messages = stmt
            .query_map(params![slug, after_id, limit], |row| {
                let user = User {
                    id: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
                    username: row
                        .get::<_, Option<String>>(5)?
                        .unwrap_or_else(|| "unknown".to_string()),
                };
                let media = if row.get::<_, Option<i64>>(6)?.is_some() {
                    Some(Media {
                        url: row.get(7)?,
                        title: row.get(8)?,
                    })
                } else {
                    None
                };
                Ok(Message {
                    id: row.get(0)?,
                    date: Self::date_column(row, 1)?,
                    content: row.get(2)?,
                    reply_to: row.get(3)?,
                    user,
                    media,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    fn get_last_archived_chat_info(&self) -> Result<Option<ChatInfo>, StoreError> {
        let info = self
            .conn
            .query_row(
                "SELECT id, title, username, archived_at
                 FROM chat_info ORDER BY rowid DESC LIMIT 1",
                [],
                |row| {
                    let archived_at = row
                        .get::<_, Option<String>>(3)?
                        .and_then(|s| Self::parse_datetime(&s).ok());
                    Ok(ChatInfo {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        username: row.get(2)?,
                        archived_at,
                    })
                },
            )
            .optional()?;
        Ok(info)
    }
}
