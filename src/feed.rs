//! RSS/Atom feed construction.
//!
//! The builder pushes every rendered message through a [`FeedWindow`] — a
//! bounded FIFO holding the most recent N messages of the whole run. Because
//! the timeline is processed in chronological order, the window ends up
//! holding exactly the chronologically-last N messages, already in order,
//! and the emitter serializes them verbatim with no re-sort.
//!
//! [`FeedEmitter`] builds one internal entry list and runs two independent
//! serializers over it: RSS 2.0 via the `rss` crate (validated before
//! writing) and an Atom document assembled as escaped XML. The two outputs
//! are content-equivalent and differ only in envelope.
//!
//! Media enclosures degrade instead of failing: a missing file probes to
//! size 0, an unrecognized file to `application/octet-stream`, and the two
//! fallbacks are independent of each other.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rss::validation::Validate;
use rss::{ChannelBuilder, EnclosureBuilder, GuidBuilder, ItemBuilder};
use thiserror::Error;

use crate::config::SiteConfig;
use crate::paging::PageIndex;
use crate::types::Message;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RSS validation failed: {0}")]
    Validation(String),
}

/// Bounded FIFO of the most recent messages rendered during a build.
#[derive(Debug)]
pub struct FeedWindow {
    capacity: usize,
    messages: VecDeque<Message>,
}

impl FeedWindow {
    /// Capacity 0 disables the window: pushes are dropped and the emitted
    /// feeds carry no entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            messages: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a message, evicting the oldest when over capacity.
    pub fn push(&mut self, message: Message) {
        if self.capacity == 0 {
            return;
        }
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    pub fn extend<I: IntoIterator<Item = Message>>(&mut self, messages: I) {
        for m in messages {
            self.push(m);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Resolved enclosure metadata for a media attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMeta {
    /// Public URL of the media file.
    pub url: String,
    /// Byte size; 0 when the file is missing or the media is remote.
    pub size: u64,
    /// Content type; `text/html` for remote media, a generic binary type
    /// when probing fails.
    pub mime: String,
}

const FALLBACK_MIME: &str = "application/octet-stream";

/// Resolve enclosure metadata for a media URL.
///
/// Remote media (a scheme separator anywhere in the local path) is not
/// probed at all. Local media probes size and content type independently —
/// either can fall back without affecting the other, and neither failure
/// aborts the feed build.
pub fn resolve_media_metadata(config: &SiteConfig, media_url: &str) -> MediaMeta {
    let media_dir = Path::new(&config.media_dir);
    let dir_base = media_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.media_dir.clone());
    let url = format!("{}/{}/{}", config.base_url(), dir_base, media_url);
    let local = format!("{}/{}", config.media_dir, media_url);

    if local.contains("://") {
        return MediaMeta {
            url,
            size: 0,
            mime: "text/html".to_string(),
        };
    }

    let size = fs::metadata(&local).map(|m| m.len()).unwrap_or(0);
    let mime = infer::get_from_path(&local)
        .ok()
        .flatten()
        .map(|t| t.mime_type().to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string());

    MediaMeta { url, size, mime }
}

/// One feed entry, shared by both serializers.
#[derive(Debug)]
pub struct FeedEntry {
    pub id: i64,
    /// Permalink into the generated site. Absent when the message's page is
    /// unknown — which cannot happen in a correct build, since every message
    /// is rendered before it reaches the window.
    pub link: Option<String>,
    pub title: String,
    pub published: DateTime<Utc>,
    pub enclosure: Option<MediaMeta>,
    /// Rendered abstract, already HTML.
    pub body: String,
}

/// Renders a custom per-entry abstract. Receives the message and the
/// resolved enclosure content type.
pub type ExcerptFn = dyn Fn(&Message, &str) -> String;

/// Converts the final [`FeedWindow`] contents into RSS and Atom documents.
pub struct FeedEmitter<'a> {
    config: &'a SiteConfig,
    excerpt: Option<Box<ExcerptFn>>,
}

impl<'a> FeedEmitter<'a> {
    pub fn new(config: &'a SiteConfig) -> Self {
        Self {
            config,
            excerpt: None,
        }
    }

    /// Install a custom abstract renderer. Without one, entries fall back
    /// to the message text, then the media title, then an empty string.
    pub fn with_excerpt(mut self, excerpt: Box<ExcerptFn>) -> Self {
        self.excerpt = Some(excerpt);
        self
    }

    /// Write `index.xml` (RSS 2.0) and `index.atom` into `publish_dir`.
    pub fn write(
        &self,
        window: &FeedWindow,
        index: &PageIndex,
        publish_dir: &Path,
    ) -> Result<(), FeedError> {
        let entries = self.entries(window, index);
        fs::write(publish_dir.join("index.xml"), self.rss_document(&entries)?)?;
        fs::write(publish_dir.join("index.atom"), self.atom_document(&entries))?;
        Ok(())
    }

    /// Build the shared entry list both serializers consume.
    pub fn entries(&self, window: &FeedWindow, index: &PageIndex) -> Vec<FeedEntry> {
        window
            .iter()
            .map(|m| {
                let link = index
                    .lookup(m.id)
                    .map(|page| format!("{}/{}#{}", self.config.base_url(), page, m.id));
                let enclosure = m
                    .media
                    .as_ref()
                    .and_then(|media| media.url.as_deref())
                    .map(|url| resolve_media_metadata(self.config, url));
                let mime = enclosure.as_ref().map(|e| e.mime.as_str()).unwrap_or("");
                let body = self.abstract_for(m, mime);
                FeedEntry {
                    id: m.id,
                    link,
                    title: format!(
                        "@{} on {} (#{})",
                        m.user.username,
                        m.date.format("%Y-%m-%d %H:%M"),
                        m.id
                    ),
                    published: m.date,
                    enclosure,
                    body,
                }
            })
            .collect()
    }

    fn abstract_for(&self, message: &Message, media_mime: &str) -> String {
        if let Some(excerpt) = &self.excerpt {
            return excerpt(message, media_mime);
        }
        if let Some(content) = message.content.as_deref().filter(|c| !c.is_empty()) {
            return content.to_string();
        }
        message
            .media
            .as_ref()
            .and_then(|m| m.title.clone())
            .unwrap_or_default()
    }

    /// Serialize the entry list as a validated RSS 2.0 document.
    pub fn rss_document(&self, entries: &[FeedEntry]) -> Result<String, FeedError> {
        let items: Vec<_> = entries
            .iter()
            .map(|entry| {
                let guid = entry.link.as_ref().map(|link| {
                    GuidBuilder::default()
                        .permalink(true)
                        .value(link.clone())
                        .build()
                });
                let enclosure = entry.enclosure.as_ref().map(|media| {
                    EnclosureBuilder::default()
                        .url(media.url.clone())
                        .length(media.size.to_string())
                        .mime_type(media.mime.clone())
                        .build()
                });
                ItemBuilder::default()
                    .title(entry.title.clone())
                    .link(entry.link.clone())
                    .guid(guid)
                    .pub_date(entry.published.to_rfc2822())
                    .description(entry.body.clone())
                    .enclosure(enclosure)
                    .build()
            })
            .collect();

        let channel = ChannelBuilder::default()
            .title(self.config.resolved_site_name())
            .link(self.config.base_url().to_string())
            .description(self.config.site_description.clone())
            .generator(generator_string())
            .items(items)
            .build();

        channel
            .validate()
            .map_err(|e| FeedError::Validation(e.to_string()))?;
        Ok(channel.to_string())
    }

    /// Serialize the entry list as an Atom document.
    pub fn atom_document(&self, entries: &[FeedEntry]) -> String {
        let base = self.config.base_url();
        let updated = entries
            .last()
            .map(|e| e.published)
            .unwrap_or_else(Utc::now)
            .to_rfc3339();

        let mut xml = String::with_capacity(4096);
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<feed xmlns=\"http://www.w3.org/2005/Atom\">\n");
        xml.push_str(&format!("  <id>{}/</id>\n", escape_xml(base)));
        xml.push_str(&format!(
            "  <title>{}</title>\n",
            escape_xml(&self.config.resolved_site_name())
        ));
        xml.push_str(&format!(
            "  <subtitle>{}</subtitle>\n",
            escape_xml(&self.config.site_description)
        ));
        xml.push_str(&format!(
            "  <link href=\"{}\" rel=\"alternate\"/>\n",
            escape_xml(base)
        ));
        xml.push_str(&format!(
            "  <generator>{}</generator>\n",
            escape_xml(&generator_string())
        ));
        xml.push_str(&format!("  <updated>{updated}</updated>\n"));

        for entry in entries {
            xml.push_str("  <entry>\n");
            let id = entry
                .link
                .clone()
                .unwrap_or_else(|| format!("{}/#{}", base, entry.id));
            xml.push_str(&format!("    <id>{}</id>\n", escape_xml(&id)));
            xml.push_str(&format!(
                "    <title>{}</title>\n",
                escape_xml(&entry.title)
            ));
            if let Some(link) = &entry.link {
                xml.push_str(&format!(
                    "    <link href=\"{}\" rel=\"alternate\"/>\n",
                    escape_xml(link)
                ));
            }
            if let Some(media) = &entry.enclosure {
                xml.push_str(&format!(
                    "    <link href=\"{}\" rel=\"enclosure\" length=\"{}\" type=\"{}\"/>\n",
                    escape_xml(&media.url),
                    media.size,
                    escape_xml(&media.mime)
                ));
            }
            let stamp = entry.published.to_rfc3339();
            xml.push_str(&format!("    <published>{stamp}</published>\n"));
            xml.push_str(&format!("    <updated>{stamp}</updated>\n"));
            xml.push_str(&format!(
                "    <content type=\"html\">{}</content>\n",
                escape_xml(&entry.body)
            ));
            xml.push_str("  </entry>\n");
        }

        xml.push_str("</feed>\n");
        xml
    }
}

fn generator_string() -> String {
    format!("chatsite {}", env!("CARGO_PKG_VERSION"))
}

/// Escape text for XML element content and attribute values.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::message_at;

    fn test_config(media_dir: &str) -> SiteConfig {
        SiteConfig {
            site_url: "https://example.com".to_string(),
            media_dir: media_dir.to_string(),
            site_name: "{group} archive".to_string(),
            group: "testgroup".to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn window_keeps_last_n_in_order() {
        let mut window = FeedWindow::new(3);
        for id in 1..=5 {
            window.push(message_at(id, "2024-01-05T09:00:00Z"));
        }
        let ids: Vec<_> = window.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn window_under_capacity_keeps_everything() {
        let mut window = FeedWindow::new(10);
        window.extend((1..=3).map(|id| message_at(id, "2024-01-05T09:00:00Z")));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn zero_capacity_window_stays_empty() {
        let mut window = FeedWindow::new(0);
        window.push(message_at(1, "2024-01-05T09:00:00Z"));
        assert!(window.is_empty());
    }

    #[test]
    fn remote_media_is_not_probed() {
        let config = test_config("media");
        let meta = resolve_media_metadata(&config, "http://example.com/x.png");
        assert_eq!(meta.size, 0);
        assert_eq!(meta.mime, "text/html");
        assert_eq!(meta.url, "https://example.com/media/http://example.com/x.png");
    }

    #[test]
    fn missing_local_media_defaults_both_fields() {
        let config = test_config("/nonexistent-media-dir");
        let meta = resolve_media_metadata(&config, "gone.bin");
        assert_eq!(meta.size, 0);
        assert_eq!(meta.mime, FALLBACK_MIME);
    }

    #[test]
    fn unrecognized_local_media_still_reports_size() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "plain text, no magic").unwrap();
        let config = test_config(dir.path().to_str().unwrap());
        let meta = resolve_media_metadata(&config, "notes.txt");
        assert_eq!(meta.size, 20);
        assert_eq!(meta.mime, FALLBACK_MIME);
    }

    #[test]
    fn recognized_local_media_probes_content_type() {
        let dir = tempfile::TempDir::new().unwrap();
        // Minimal PNG signature is enough for a content-based probe.
        let png = [0x89u8, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        std::fs::write(dir.path().join("pic.png"), png).unwrap();
        let config = test_config(dir.path().to_str().unwrap());
        let meta = resolve_media_metadata(&config, "pic.png");
        assert_eq!(meta.size, png.len() as u64);
        assert_eq!(meta.mime, "image/png");
    }

    #[test]
    fn media_url_uses_dir_basename() {
        let config = test_config("data/downloads/media");
        let meta = resolve_media_metadata(&config, "f.bin");
        assert_eq!(meta.url, "https://example.com/media/f.bin");
    }

    #[test]
    fn entry_links_resolve_through_page_index() {
        let config = test_config("media");
        let mut index = PageIndex::new();
        index.record(7, "2024-01.html");
        let mut window = FeedWindow::new(10);
        window.push(message_at(7, "2024-01-05T09:00:00Z"));
        window.push(message_at(8, "2024-01-06T09:00:00Z"));

        let entries = FeedEmitter::new(&config).entries(&window, &index);
        assert_eq!(
            entries[0].link.as_deref(),
            Some("https://example.com/2024-01.html#7")
        );
        assert_eq!(entries[1].link, None);
    }

    #[test]
    fn entry_title_names_user_and_id() {
        let config = test_config("media");
        let mut window = FeedWindow::new(10);
        window.push(message_at(7, "2024-01-05T09:30:00Z"));
        let entries = FeedEmitter::new(&config).entries(&window, &PageIndex::new());
        assert_eq!(entries[0].title, "@alice on 2024-01-05 09:30 (#7)");
    }

    #[test]
    fn abstract_falls_back_content_then_media_title() {
        let config = test_config("media");
        let emitter = FeedEmitter::new(&config);

        let with_content = message_at(1, "2024-01-05T09:00:00Z");
        assert_eq!(emitter.abstract_for(&with_content, ""), "message 1");

        let mut media_only = message_at(2, "2024-01-05T09:00:00Z");
        media_only.content = None;
        media_only.media = Some(crate::types::Media {
            url: None,
            title: Some("a photo".to_string()),
        });
        assert_eq!(emitter.abstract_for(&media_only, ""), "a photo");

        let mut bare = message_at(3, "2024-01-05T09:00:00Z");
        bare.content = None;
        assert_eq!(emitter.abstract_for(&bare, ""), "");
    }

    #[test]
    fn custom_excerpt_takes_priority() {
        let config = test_config("media");
        let emitter = FeedEmitter::new(&config)
            .with_excerpt(Box::new(|m, mime| format!("#{} [{}]", m.id, mime)));
        let message = message_at(9, "2024-01-05T09:00:00Z");
        assert_eq!(emitter.abstract_for(&message, "image/png"), "#9 [image/png]");
    }

    #[test]
    fn rss_and_atom_share_the_entry_set() {
        let config = test_config("media");
        let mut index = PageIndex::new();
        index.record(1, "2024-01.html");
        index.record(2, "2024-01.html");
        let mut window = FeedWindow::new(10);
        window.push(message_at(1, "2024-01-05T09:00:00Z"));
        window.push(message_at(2, "2024-01-06T09:00:00Z"));

        let emitter = FeedEmitter::new(&config);
        let entries = emitter.entries(&window, &index);
        let rss = emitter.rss_document(&entries).unwrap();
        let atom = emitter.atom_document(&entries);

        for link in ["2024-01.html#1", "2024-01.html#2"] {
            assert!(rss.contains(link));
            assert!(atom.contains(link));
        }
        assert!(rss.contains("testgroup archive"));
        assert!(atom.contains("testgroup archive"));
        assert_eq!(atom.matches("<entry>").count(), 2);
    }

    #[test]
    fn empty_window_emits_empty_documents() {
        let config = test_config("media");
        let emitter = FeedEmitter::new(&config);
        let entries = emitter.entries(&FeedWindow::new(0), &PageIndex::new());
        assert!(entries.is_empty());
        assert!(emitter.rss_document(&entries).is_ok());
        assert_eq!(emitter.atom_document(&entries).matches("<entry>").count(), 0);
    }

    #[test]
    fn atom_escapes_markup_in_content() {
        let config = test_config("media");
        let mut window = FeedWindow::new(10);
        let mut message = message_at(1, "2024-01-05T09:00:00Z");
        message.content = Some("<b>bold & brash</b>".to_string());
        window.push(message);
        let emitter = FeedEmitter::new(&config);
        let atom = emitter.atom_document(&emitter.entries(&window, &PageIndex::new()));
        assert!(atom.contains("&lt;b&gt;bold &amp; brash&lt;/b&gt;"));
        assert!(!atom.contains("<b>bold"));
    }
}
