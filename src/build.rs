//! Site build orchestration.
//!
//! [`SiteBuilder`] drives the whole build as one sequential pass: prepare
//! the publish directory, walk the timeline month by month, paginate and
//! render each month, then finalize the index link and emit feeds.
//!
//! ```text
//! prepare dir → per-month loop → index.html → feeds
//! ```
//!
//! The [`PageIndex`] and [`FeedWindow`] are owned state threaded through the
//! loop — created fresh per build, dropped when it ends. File writes are not
//! transactional: a failed build leaves a partially populated directory,
//! which is acceptable because the directory was wiped at the start.
//!
//! An empty timeline is a controlled no-op (the summary reports it), not an
//! error. Everything else propagates.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use walkdir::WalkDir;

use crate::config::SiteConfig;
use crate::feed::{FeedEmitter, FeedError, FeedWindow};
use crate::paging::{PageIndex, Paginator, total_pages};
use crate::render::{PageContext, Pagination, render_page};
use crate::store::{Storage, StoreError};
use crate::types::{ChatInfo, Month};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
}

/// Per-month build result, for reporting.
#[derive(Debug)]
pub struct MonthBuild {
    pub slug: String,
    pub pages: u32,
    pub messages: u64,
}

/// What a build produced.
#[derive(Debug)]
pub struct BuildSummary {
    pub months: Vec<MonthBuild>,
    /// Page file `index.html` points at, absent when nothing was produced.
    pub index_target: Option<String>,
    pub feeds_written: bool,
    /// True when the archive held no data at all; the build was a no-op.
    pub empty: bool,
}

/// Orchestrates one site build over a [`Storage`] implementation.
pub struct SiteBuilder<'a, S: Storage + ?Sized> {
    config: &'a SiteConfig,
    store: &'a S,
    symlink: bool,
    chat_info: Option<ChatInfo>,
}

impl<'a, S: Storage + ?Sized> SiteBuilder<'a, S> {
    /// The archived-chat metadata is fetched once here and passed through
    /// to every rendered page verbatim.
    pub fn new(config: &'a SiteConfig, store: &'a S) -> Result<Self, BuildError> {
        let chat_info = store.get_last_archived_chat_info()?;
        Ok(Self {
            config,
            store,
            symlink: false,
            chat_info,
        })
    }

    /// Materialize assets and the final index as symlinks instead of copies.
    pub fn symlink(mut self, symlink: bool) -> Self {
        self.symlink = symlink;
        self
    }

    /// Run the full build.
    pub fn build(&self) -> Result<BuildSummary, BuildError> {
        self.create_publish_dir()?;
        let publish_dir = Path::new(&self.config.publish_dir);

        let timeline = self.store.get_timeline()?;
        if timeline.is_empty() {
            return Ok(BuildSummary {
                months: Vec::new(),
                index_target: None,
                feeds_written: false,
                empty: true,
            });
        }

        let mut by_year: BTreeMap<i32, Vec<Month>> = BTreeMap::new();
        for month in &timeline {
            by_year.entry(month.year).or_default().push(month.clone());
        }

        let feed_capacity = if self.config.publish_rss_feed {
            self.config.rss_feed_entries
        } else {
            0
        };
        let mut page_index = PageIndex::new();
        let mut window = FeedWindow::new(feed_capacity);
        let mut months = Vec::new();
        let mut last_filename: Option<String> = None;

        for month in &timeline {
            let dayline = self.store.get_dayline(month.year, month.month)?;
            let total = self.store.get_message_count(month.year, month.month)?;
            let pages_total = total_pages(total, self.config.per_page);

            let mut paginator = Paginator::new(self.store, month, self.config.per_page);
            let mut pages = 0;
            while let Some(batch) = paginator.next_batch()? {
                // Record before rendering so same-page replies resolve too.
                for m in &batch.messages {
                    page_index.record(m.id, &batch.filename);
                }

                let ctx = PageContext {
                    config: self.config,
                    chat_info: self.chat_info.as_ref(),
                    timeline: &by_year,
                    month,
                    dayline: &dayline,
                    messages: &batch.messages,
                    page_index: &page_index,
                    pagination: Pagination {
                        current: batch.page,
                        total: pages_total,
                    },
                };
                let html = render_page(&ctx).into_string();
                fs::write(publish_dir.join(&batch.filename), html)?;

                window.extend(batch.messages);
                last_filename = Some(batch.filename);
                pages = batch.page;
            }

            if pages > 0 {
                months.push(MonthBuild {
                    slug: month.slug.clone(),
                    pages,
                    messages: total,
                });
            }
        }

        // The chronologically last page is the freshest content. Make it
        // the site index.
        if let Some(filename) = &last_filename {
            self.finalize_index(publish_dir, filename)?;
        }

        let feeds_written = self.config.publish_rss_feed;
        if feeds_written {
            FeedEmitter::new(self.config).write(&window, &page_index, publish_dir)?;
        }

        Ok(BuildSummary {
            months,
            index_target: last_filename,
            feeds_written,
            empty: false,
        })
    }

    /// Wipe and recreate the publish directory, then mirror the static
    /// assets and, when present, the media directory into it.
    fn create_publish_dir(&self) -> Result<(), BuildError> {
        let publish_dir = Path::new(&self.config.publish_dir);
        if publish_dir.exists() {
            fs::remove_dir_all(publish_dir)?;
        }
        fs::create_dir_all(publish_dir)?;

        let static_dir = Path::new(&self.config.static_dir);
        self.materialize(static_dir, publish_dir)?;

        let media_dir = Path::new(&self.config.media_dir);
        if media_dir.exists() {
            self.materialize(media_dir, publish_dir)?;
        }
        Ok(())
    }

    /// Place `source` inside `publish_dir` under its basename, as a symlink
    /// or a (recursive) copy depending on the build mode.
    fn materialize(&self, source: &Path, publish_dir: &Path) -> Result<(), BuildError> {
        let name = source
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| source.as_os_str().to_os_string());
        let target = publish_dir.join(name);

        if self.symlink {
            symlink_or_copy(&source.canonicalize()?, &target)?;
        } else if source.is_file() {
            fs::copy(source, &target)?;
        } else {
            copy_dir_recursive(source, &target)?;
        }
        Ok(())
    }

    fn finalize_index(&self, publish_dir: &Path, filename: &str) -> Result<(), BuildError> {
        let index = publish_dir.join("index.html");
        if self.symlink {
            symlink_or_copy(Path::new(filename), &index)?;
        } else {
            fs::copy(publish_dir.join(filename), &index)?;
        }
        Ok(())
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn symlink_or_copy(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Platforms without reliable symlink support fall back to a copy.
#[cfg(not(unix))]
fn symlink_or_copy(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        copy_dir_recursive(src, dst)
    } else {
        fs::copy(src, dst).map(|_| ())
    }
}
