//! CLI output formatting.
//!
//! Each command has a `format_*` function returning `Vec<String>` for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.
//!
//! ## Build
//!
//! ```text
//! 001 2024-01 → 2 pages (3 messages)
//! 002 2024-02 → 1 page (1 message)
//!
//! index.html → 2024-01_2.html
//! Feeds
//!     index.xml
//!     index.atom
//!
//! Published 2 months, 3 pages
//! ```
//!
//! ## Check
//!
//! ```text
//! Archive: Test Group (@testgroup)
//! 001 2024-01 (3 messages)
//!
//! 1 month, 3 messages — config OK
//! ```

use crate::build::BuildSummary;
use crate::types::{ChatInfo, Month};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{pos:0>3}")
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: u64, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Format the result of a full build.
pub fn format_build_output(summary: &BuildSummary) -> Vec<String> {
    if summary.empty {
        return vec!["no data found to publish site".to_string()];
    }

    let mut lines = Vec::new();
    for (pos, month) in summary.months.iter().enumerate() {
        lines.push(format!(
            "{} {} → {} ({})",
            format_index(pos + 1),
            month.slug,
            plural(u64::from(month.pages), "page"),
            plural(month.messages, "message"),
        ));
    }

    if let Some(target) = &summary.index_target {
        lines.push(String::new());
        lines.push(format!("index.html → {target}"));
    }

    if summary.feeds_written {
        lines.push("Feeds".to_string());
        lines.push(format!("{}index.xml", indent(1)));
        lines.push(format!("{}index.atom", indent(1)));
    }

    let total_pages: u64 = summary.months.iter().map(|m| u64::from(m.pages)).sum();
    lines.push(String::new());
    lines.push(format!(
        "Published {}, {}",
        plural(summary.months.len() as u64, "month"),
        plural(total_pages, "page"),
    ));
    lines
}

pub fn print_build_output(summary: &BuildSummary) {
    for line in format_build_output(summary) {
        println!("{line}");
    }
}

/// Format the result of `chatsite check`: a timeline inventory.
pub fn format_check_output(
    months: &[(Month, u64)],
    chat_info: Option<&ChatInfo>,
) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(info) = chat_info {
        let title = info.title.as_deref().unwrap_or("(untitled)");
        match &info.username {
            Some(username) => lines.push(format!("Archive: {title} (@{username})")),
            None => lines.push(format!("Archive: {title}")),
        }
    }

    for (pos, (month, count)) in months.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(pos + 1),
            month.slug,
            plural(*count, "message"),
        ));
    }

    let total: u64 = months.iter().map(|(_, c)| c).sum();
    lines.push(String::new());
    lines.push(format!(
        "{}, {} — config OK",
        plural(months.len() as u64, "month"),
        plural(total, "message"),
    ));
    lines
}

pub fn print_check_output(months: &[(Month, u64)], chat_info: Option<&ChatInfo>) {
    for line in format_check_output(months, chat_info) {
        println!("{line}");
    }
}
