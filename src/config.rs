//! Site configuration module.
//!
//! Handles loading and validating `config.toml`. Configuration is sparse:
//! stock defaults are overridden by whatever keys the user's file sets, and
//! unknown keys are rejected to catch typos early.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! publish_dir = "site"          # Output directory (wiped on every build)
//! static_dir = "static"         # Static assets, mirrored into the output
//! media_dir = "media"           # Downloaded media, mirrored if present
//! per_page = 500                # Messages per page
//! publish_rss_feed = true       # Emit index.xml + index.atom
//! rss_feed_entries = 100        # Entries kept in the feeds (0 disables)
//! site_url = "https://example.com"
//! site_name = "{group} archive"  # {group} is substituted
//! site_description = "Public archive"
//! group = "mygroup"             # Chat/group identifier
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse — override just the values you want:
//!
//! ```toml
//! per_page = 200
//! group = "rustlang"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Output directory. Deleted and recreated by every build.
    pub publish_dir: String,
    /// Static assets directory, mirrored into the output root.
    pub static_dir: String,
    /// Media directory. Mirrored into the output (by its basename) when it
    /// exists; message media URLs resolve relative to it.
    pub media_dir: String,
    /// Messages per generated page.
    pub per_page: u32,
    /// Whether to emit RSS/Atom feeds alongside the pages.
    pub publish_rss_feed: bool,
    /// Number of most recent messages kept in the feeds. 0 disables the
    /// feed content while still emitting empty documents.
    pub rss_feed_entries: usize,
    /// Public base URL of the site, without a trailing slash.
    pub site_url: String,
    /// Site title. The literal `{group}` is replaced with [`Self::group`].
    pub site_name: String,
    /// Site description, used as the feed subtitle.
    pub site_description: String,
    /// Chat/group identifier, substituted into the site name.
    pub group: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            publish_dir: "site".to_string(),
            static_dir: "static".to_string(),
            media_dir: "media".to_string(),
            per_page: 500,
            publish_rss_feed: true,
            rss_feed_entries: 100,
            site_url: "https://example.com".to_string(),
            site_name: "{group} archive".to_string(),
            site_description: "Public chat archive".to_string(),
            group: "mygroup".to_string(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.per_page == 0 {
            return Err(ConfigError::Validation("per_page must be non-zero".into()));
        }
        if self.publish_dir.is_empty() {
            return Err(ConfigError::Validation(
                "publish_dir must not be empty".into(),
            ));
        }
        if self.publish_rss_feed && self.site_url.is_empty() {
            return Err(ConfigError::Validation(
                "site_url is required when publish_rss_feed is enabled".into(),
            ));
        }
        Ok(())
    }

    /// Site title with `{group}` substituted.
    pub fn resolved_site_name(&self) -> String {
        self.site_name.replace("{group}", &self.group)
    }

    /// Base URL with any trailing slash removed, for safe joining.
    pub fn base_url(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }
}

/// Load configuration from a `config.toml` file.
///
/// A missing file yields the stock defaults, matching the sparse-override
/// model. The result is always validated.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let config = if path.exists() {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)?
    } else {
        SiteConfig::default()
    };
    config.validate()?;
    Ok(config)
}

/// A documented stock `config.toml`, printed by `chatsite gen-config`.
pub fn stock_config_toml() -> String {
    let defaults = SiteConfig::default();
    format!(
        r#"# chatsite configuration. All options are optional - defaults shown.

# Output directory. Deleted and recreated by every build.
publish_dir = "{publish_dir}"

# Static assets directory, mirrored into the output root.
static_dir = "{static_dir}"

# Media directory. Mirrored into the output when it exists.
media_dir = "{media_dir}"

# Messages per generated page.
per_page = {per_page}

# Emit index.xml (RSS) and index.atom alongside the pages.
publish_rss_feed = {publish_rss_feed}

# Number of most recent messages kept in the feeds. 0 disables them.
rss_feed_entries = {rss_feed_entries}

# Public base URL of the site, without a trailing slash.
site_url = "{site_url}"

# Site title. {{group}} is replaced with the group value below.
site_name = "{site_name}"

# Site description, used as the feed subtitle.
site_description = "{site_description}"

# Chat/group identifier.
group = "{group}"
"#,
        publish_dir = defaults.publish_dir,
        static_dir = defaults.static_dir,
        media_dir = defaults.media_dir,
        per_page = defaults.per_page,
        publish_rss_feed = defaults.publish_rss_feed,
        rss_feed_entries = defaults.rss_feed_entries,
        site_url = defaults.site_url,
        site_name = defaults.site_name,
        site_description = defaults.site_description,
        group = defaults.group,
    )
}
