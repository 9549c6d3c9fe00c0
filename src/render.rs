//! HTML page rendering.
//!
//! Renders one archive page per pagination batch using
//! [maud](https://maud.lambda.xyz/) — type-safe compile-time templates with
//! automatic XSS escaping. The only `PreEscaped` content is the message
//! body, which is escaped first and then run through [`nl2br`].
//!
//! ## Page anatomy
//!
//! - Site header: resolved site name, description, archived-chat metadata
//! - Month navigation: the whole timeline grouped by year
//! - Dayline: in-page jump links to each day with its message count
//! - Message list: permalink anchor per message, reply back-links resolved
//!   through the [`PageIndex`], media links, day headings
//! - Pagination footer: prev/next links plus "page N of M"
//!
//! The renderer receives everything it needs through [`PageContext`] — a
//! read-only capability struct — and the pure helpers [`page_filename`] and
//! [`nl2br`]; it holds no mutable state of its own.

use std::collections::BTreeMap;

use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::config::SiteConfig;
use crate::paging::{PageIndex, page_filename};
use crate::types::{ChatInfo, DaySummary, Message, Month};

/// Position of the current page within its month.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    /// 1-based page number.
    pub current: u32,
    /// Total pages in the month (display only).
    pub total: u64,
}

/// Everything one page render needs, read-only.
pub struct PageContext<'a> {
    pub config: &'a SiteConfig,
    pub chat_info: Option<&'a ChatInfo>,
    /// Full timeline grouped by year, ascending.
    pub timeline: &'a BTreeMap<i32, Vec<Month>>,
    pub month: &'a Month,
    pub dayline: &'a [DaySummary],
    pub messages: &'a [Message],
    pub page_index: &'a PageIndex,
    pub pagination: Pagination,
}

/// Collapse runs of 2+ newlines to one blank line, then append a `<br />`
/// after every remaining newline run.
///
/// The newline itself is kept in front of the break token so that link
/// auto-detection in downstream processing is not disrupted.
pub fn nl2br(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\n' {
            out.push(c);
            continue;
        }
        let mut run = 1;
        while chars.peek() == Some(&'\n') {
            chars.next();
            run += 1;
        }
        if run >= 2 {
            out.push_str("\n\n<br />");
        } else {
            out.push_str("\n<br />");
        }
    }
    out
}

/// Message text as markup: escaped first, then newline runs converted.
fn message_body(text: &str) -> Markup {
    let escaped = html! { (text) }.into_string();
    PreEscaped(nl2br(&escaped))
}

/// Render one archive page.
pub fn render_page(ctx: &PageContext) -> Markup {
    let title = format!("{} - {}", ctx.config.resolved_site_name(), ctx.month.slug);
    let static_base = basename(&ctx.config.static_dir);

    let content = html! {
        (site_header(ctx))
        div.layout {
            (month_nav(ctx))
            main.month-page {
                h2 { (ctx.month.slug) }
                (dayline(ctx.dayline))
                (message_list(ctx))
                (pagination_footer(ctx))
            }
        }
    };

    base_document(&title, &static_base, content)
}

fn base_document(title: &str, static_base: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                link rel="stylesheet" href={ (static_base) "/style.css" };
                link rel="alternate" type="application/rss+xml" href="index.xml";
                link rel="alternate" type="application/atom+xml" href="index.atom";
            }
            body {
                (content)
            }
        }
    }
}

fn site_header(ctx: &PageContext) -> Markup {
    html! {
        header.site-header {
            h1 { a href="index.html" { (ctx.config.resolved_site_name()) } }
            p.site-description { (ctx.config.site_description) }
            @if let Some(info) = ctx.chat_info {
                p.chat-info {
                    @if let Some(chat_title) = &info.title { span.chat-title { (chat_title) } }
                    @if let Some(username) = &info.username { " @" (username) }
                    @if let Some(at) = info.archived_at {
                        span.archived-at { " archived " (at.format("%Y-%m-%d")) }
                    }
                }
            }
        }
    }
}

/// Year-grouped month navigation over the whole timeline.
fn month_nav(ctx: &PageContext) -> Markup {
    html! {
        nav.timeline {
            @for (year, months) in ctx.timeline {
                section.year {
                    h3 { (year) }
                    ul {
                        @for month in months {
                            @let current = month.slug == ctx.month.slug;
                            li class=[current.then_some("current")] {
                                a href=(page_filename(&month.slug, 1)) { (month.slug) }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// In-page day jump links with message counts.
fn dayline(days: &[DaySummary]) -> Markup {
    html! {
        @if !days.is_empty() {
            nav.dayline {
                ul {
                    @for day in days {
                        li {
                            a href={ "#" (day.slug) } { (day.slug) }
                            span.count { " (" (day.count) ")" }
                        }
                    }
                }
            }
        }
    }
}

fn message_list(ctx: &PageContext) -> Markup {
    // Group consecutive messages by day so each day gets one heading, which
    // doubles as the dayline jump target.
    let mut groups: Vec<(String, Vec<&Message>)> = Vec::new();
    for m in ctx.messages {
        let day = m.date.format("%Y-%m-%d").to_string();
        match groups.last_mut() {
            Some((d, ms)) if *d == day => ms.push(m),
            _ => groups.push((day, vec![m])),
        }
    }
    html! {
        section.messages {
            @for (day, messages) in &groups {
                h3.day id=(day) { (day) }
                @for m in messages {
                    (message_item(m, ctx))
                }
            }
        }
    }
}

fn message_item(m: &Message, ctx: &PageContext) -> Markup {
    html! {
        article.message id=(m.id) {
            header {
                span.username { "@" (m.user.username) }
                " "
                a.permalink href={ "#" (m.id) } { time { (m.date.format("%H:%M")) } }
                span.msg-id { " #" (m.id) }
            }
            @if let Some(reply_to) = m.reply_to {
                (reply_link(reply_to, ctx.page_index))
            }
            @if let Some(content) = &m.content {
                div.content { (message_body(content)) }
            }
            @if let Some(media) = &m.media {
                @if let Some(url) = &media.url {
                    div.media {
                        a href={ (basename(&ctx.config.media_dir)) "/" (url) } {
                            (media.title.as_deref().unwrap_or("media"))
                        }
                    }
                }
            }
        }
    }
}

/// Reply back-link. A parent outside the archived range renders as inert
/// grayed-out text instead of a hyperlink.
fn reply_link(reply_to: i64, index: &PageIndex) -> Markup {
    html! {
        div.reply {
            @if let Some(page) = index.lookup(reply_to) {
                "in reply to " a href={ (page) "#" (reply_to) } { "#" (reply_to) }
            } @else {
                span.reply-missing { "in reply to #" (reply_to) }
            }
        }
    }
}

fn pagination_footer(ctx: &PageContext) -> Markup {
    let Pagination { current, total } = ctx.pagination;
    let slug = &ctx.month.slug;
    html! {
        nav.pagination {
            @if current > 1 {
                a.prev href=(page_filename(slug, current - 1)) { "newer" }
            }
            span.position { "page " (current) " of " (total) }
            @if u64::from(current) < total {
                a.next href=(page_filename(slug, current + 1)) { "older" }
            }
        }
    }
}

fn basename(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::message_at;

    fn context_fixture<'a>(
        config: &'a SiteConfig,
        timeline: &'a BTreeMap<i32, Vec<Month>>,
        month: &'a Month,
        messages: &'a [Message],
        index: &'a PageIndex,
        pagination: Pagination,
    ) -> PageContext<'a> {
        PageContext {
            config,
            chat_info: None,
            timeline,
            month,
            dayline: &[],
            messages,
            page_index: index,
            pagination,
        }
    }

    #[test]
    fn nl2br_collapses_runs_and_inserts_breaks() {
        assert_eq!(nl2br("a\n\n\nb\nc"), "a\n\n<br />b\n<br />c");
    }

    #[test]
    fn nl2br_single_newline() {
        assert_eq!(nl2br("a\nb"), "a\n<br />b");
    }

    #[test]
    fn nl2br_no_newlines_passthrough() {
        assert_eq!(nl2br("plain"), "plain");
    }

    #[test]
    fn nl2br_long_runs_collapse_to_one_blank_line() {
        assert_eq!(nl2br("a\n\n\n\n\nb"), "a\n\n<br />b");
    }

    #[test]
    fn message_body_escapes_before_breaking() {
        let body = message_body("<b>x</b>\ny").into_string();
        assert!(body.contains("&lt;b&gt;x&lt;/b&gt;"));
        assert!(body.contains("\n<br />y"));
        assert!(!body.contains("<b>x"));
    }

    #[test]
    fn resolved_reply_renders_hyperlink() {
        let mut index = PageIndex::new();
        index.record(5, "2023-12.html");
        let markup = reply_link(5, &index).into_string();
        assert!(markup.contains(r#"href="2023-12.html#5""#));
    }

    #[test]
    fn unresolved_reply_renders_inert_text() {
        let markup = reply_link(5, &PageIndex::new()).into_string();
        assert!(!markup.contains("href"));
        assert!(markup.contains("reply-missing"));
        assert!(markup.contains("in reply to #5"));
    }

    #[test]
    fn page_carries_message_anchors_and_day_headings() {
        let config = SiteConfig::default();
        let month = Month::new(2024, 1);
        let timeline = BTreeMap::from([(2024, vec![month.clone()])]);
        let messages = vec![
            message_at(1, "2024-01-05T09:00:00Z"),
            message_at(2, "2024-01-06T09:00:00Z"),
        ];
        let index = PageIndex::new();
        let ctx = context_fixture(
            &config,
            &timeline,
            &month,
            &messages,
            &index,
            Pagination { current: 1, total: 1 },
        );
        let html = render_page(&ctx).into_string();
        assert!(html.contains(r#"id="1""#));
        assert!(html.contains(r#"id="2""#));
        assert!(html.contains(r#"id="2024-01-05""#));
        assert!(html.contains(r#"id="2024-01-06""#));
    }

    #[test]
    fn pagination_links_point_at_neighbor_pages() {
        let config = SiteConfig::default();
        let month = Month::new(2024, 1);
        let timeline = BTreeMap::from([(2024, vec![month.clone()])]);
        let messages = vec![message_at(3, "2024-01-07T09:00:00Z")];
        let index = PageIndex::new();
        let ctx = context_fixture(
            &config,
            &timeline,
            &month,
            &messages,
            &index,
            Pagination { current: 2, total: 3 },
        );
        let html = render_page(&ctx).into_string();
        assert!(html.contains(r#"href="2024-01.html""#));
        assert!(html.contains(r#"href="2024-01_3.html""#));
        assert!(html.contains("page 2 of 3"));
    }

    #[test]
    fn first_page_has_no_newer_link() {
        let config = SiteConfig::default();
        let month = Month::new(2024, 1);
        let timeline = BTreeMap::from([(2024, vec![month.clone()])]);
        let messages = vec![message_at(1, "2024-01-05T09:00:00Z")];
        let index = PageIndex::new();
        let ctx = context_fixture(
            &config,
            &timeline,
            &month,
            &messages,
            &index,
            Pagination { current: 1, total: 2 },
        );
        let html = render_page(&ctx).into_string();
        assert!(!html.contains(r#"class="prev""#));
        assert!(html.contains(r#"class="next""#));
    }

    #[test]
    fn month_nav_marks_current_month() {
        let config = SiteConfig::default();
        let month = Month::new(2024, 2);
        let timeline = BTreeMap::from([(2024, vec![Month::new(2024, 1), month.clone()])]);
        let messages = vec![message_at(1, "2024-02-05T09:00:00Z")];
        let index = PageIndex::new();
        let ctx = context_fixture(
            &config,
            &timeline,
            &month,
            &messages,
            &index,
            Pagination { current: 1, total: 1 },
        );
        let html = render_page(&ctx).into_string();
        assert!(html.contains(r#"class="current""#));
        assert!(html.contains(r#"href="2024-01.html""#));
        assert!(html.contains(r#"href="2024-02.html""#));
    }

    #[test]
    fn usernames_are_escaped() {
        let config = SiteConfig::default();
        let month = Month::new(2024, 1);
        let timeline = BTreeMap::from([(2024, vec![month.clone()])]);
        let mut message = message_at(1, "2024-01-05T09:00:00Z");
        message.user.username = "<script>alert('x')</script>".to_string();
        let messages = vec![message];
        let index = PageIndex::new();
        let ctx = context_fixture(
            &config,
            &timeline,
            &month,
            &messages,
            &index,
            Pagination { current: 1, total: 1 },
        );
        let html = render_page(&ctx).into_string();
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
