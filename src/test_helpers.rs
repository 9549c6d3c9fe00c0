//! Shared test utilities for the chatsite test suite.
//!
//! Provides an in-memory archive store pre-seeded with the tables the
//! archiver produces, plus message fixtures matching the seeded rows.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::store::SqliteStore;
use crate::types::{Message, User};

/// The archive tables [`SqliteStore`] reads. Production databases are
/// created by the archiver; tests create them here.
pub(crate) const ARCHIVE_SCHEMA: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL
    );
    CREATE TABLE media (
        id INTEGER PRIMARY KEY,
        url TEXT,
        title TEXT
    );
    CREATE TABLE messages (
        id INTEGER PRIMARY KEY,
        date TEXT NOT NULL,
        content TEXT,
        reply_to INTEGER,
        user_id INTEGER REFERENCES users(id),
        media_id INTEGER REFERENCES media(id)
    );
    CREATE TABLE chat_info (
        id INTEGER PRIMARY KEY,
        title TEXT,
        username TEXT,
        archived_at TEXT
    );
";

/// In-memory store seeded with `(id, rfc3339-date)` messages, all authored
/// by user `alice` with content `message <id>`, plus one chat_info row
/// titled "Test Group".
pub(crate) fn seeded_store(messages: &[(i64, &str)]) -> SqliteStore {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(ARCHIVE_SCHEMA).unwrap();
    conn.execute("INSERT INTO users (id, username) VALUES (1, 'alice')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO chat_info (id, title, username, archived_at)
         VALUES (1, 'Test Group', 'testgroup', '2024-03-01T00:00:00Z')",
        [],
    )
    .unwrap();
    for (id, date) in messages {
        conn.execute(
            "INSERT INTO messages (id, date, content, user_id) VALUES (?1, ?2, ?3, 1)",
            rusqlite::params![id, date, format!("message {id}")],
        )
        .unwrap();
    }
    SqliteStore::from_connection(conn)
}

/// A message fixture matching what [`seeded_store`] produces.
pub(crate) fn message_at(id: i64, date: &str) -> Message {
    Message {
        id,
        date: DateTime::parse_from_rfc3339(date)
            .unwrap()
            .with_timezone(&Utc),
        user: User {
            id: 1,
            username: "alice".to_string(),
        },
        content: Some(format!("message {id}")),
        reply_to: None,
        media: None,
    }
}
