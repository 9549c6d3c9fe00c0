//! # chatsite
//!
//! A minimal static site generator for archived group-chat history. A
//! SQLite archive produced by a chat archiver is the data source: months
//! become pages, messages are ordered by id, and the freshest page becomes
//! the site index.
//!
//! # Architecture: One Sequential Pass
//!
//! A build is a single synchronous pass over the archive timeline:
//!
//! ```text
//! 1. Prepare   wipe + recreate publish_dir, mirror static/media assets
//! 2. Paginate  per month: keyset-paginated batches → one HTML page each
//! 3. Finalize  last page → index.html (symlink or copy)
//! 4. Feeds     last N messages → index.xml (RSS 2.0) + index.atom
//! ```
//!
//! Two pieces of state accumulate across the pass and are threaded through
//! it explicitly:
//!
//! - [`paging::PageIndex`] — message id → page filename, so reply links can
//!   point at parent messages on arbitrary pages across months.
//! - [`feed::FeedWindow`] — bounded FIFO of the most recent messages,
//!   which becomes the feed content after the pass.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`store`] | `Storage` trait + read-only SQLite archive reader |
//! | [`paging`] | Keyset pagination, page filenames, the page index |
//! | [`render`] | Maud HTML templates for archive pages |
//! | [`feed`] | Feed window, enclosure resolution, RSS/Atom emission |
//! | [`build`] | Orchestration: directory prep, per-month loop, finalize |
//! | [`config`] | `config.toml` loading, validation, stock config |
//! | [`types`] | Shared data model (`Month`, `Message`, ...) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Keyset Pagination
//!
//! Pages are cut with a last-seen-id cursor (`id > cursor ORDER BY id
//! LIMIT n`) rather than offset/limit. Message ids are monotonic and unique
//! across the corpus, so boundaries are stable, nothing is skipped or
//! duplicated, and deep months don't pay an offset scan cost.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), a compile-time
//! HTML macro system. Malformed HTML is a build error, template variables
//! are Rust expressions, interpolation is auto-escaped, and there is no
//! template directory to ship or get out of sync.
//!
//! ## One Entry Set, Two Feeds
//!
//! RSS and Atom are serialized from the same internal entry list, built
//! once. The two documents are content-equivalent by construction and
//! differ only in envelope format.
//!
//! ## Tolerant Media Probing
//!
//! Feed enclosures never abort a build: a missing media file probes to
//! size 0, an unrecognized one to a generic binary content type, and the
//! two fallbacks are independent. Remote media (URL instead of a local
//! file) is not probed at all.
//!
//! ## Wipe-On-Build Output
//!
//! The publish directory is deleted and recreated at the start of every
//! build. Writes are not transactional; a failed build leaves a partial
//! directory, never a corrupted mix of old and new.

pub mod build;
pub mod config;
pub mod feed;
pub mod output;
pub mod paging;
pub mod render;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
