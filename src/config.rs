//! Configuration file parser for newsreel.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::feed::DEFAULT_USER_AGENT;
use crate::util::validate_feed_url;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Unknown timezone '{0}' (expected an IANA name such as Europe/Amsterdam)")]
    InvalidTimezone(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed URLs, fetched in this order on every pass.
    pub feeds: Vec<String>,

    /// Seconds between ingestion passes.
    pub refresh_interval_secs: u64,

    /// Per-feed timeout in seconds, covering connect and download.
    pub fetch_timeout_secs: u64,

    /// User-Agent header sent with feed requests.
    pub user_agent: String,

    /// SQLite database file.
    pub database: String,

    /// Address the web server binds to.
    pub listen: String,

    /// IANA timezone used for stored and displayed timestamps.
    pub timezone: String,

    /// Articles shown on the index page.
    pub page_size: usize,

    /// Items in the derived RSS feed.
    pub feed_size: usize,

    pub channel_title: String,
    pub channel_link: String,
    pub channel_description: String,
}

const DEFAULT_FEEDS: &[&str] = &[
    "https://feeds.nos.nl/nosnieuwsalgemeen",
    "https://www.nrc.nl/rss/",
    "https://fd.nl/?rss",
    "https://www.nu.nl/rss/algemeen",
    "https://www.ad.nl/home/rss.xml",
    "https://www.volkskrant.nl/voorpagina/rss.xml",
    "https://www.volkskrant.nl/nieuws-achtergrond/rss.xml",
    "https://www.volkskrant.nl/columns-opinie/rss.xml",
    "https://www.telegraaf.nl/rss",
    "https://www.trouw.nl/voorpagina/rss.xml",
];

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            refresh_interval_secs: 60,
            fetch_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            database: "articles.db".to_string(),
            listen: "127.0.0.1:5000".to_string(),
            timezone: "Europe/Amsterdam".to_string(),
            page_size: 25,
            feed_size: 10,
            channel_title: "newsreel".to_string(),
            channel_link: "http://127.0.0.1:5000/rss".to_string(),
            channel_description: "Latest articles collected from the configured news feeds."
                .to_string(),
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: &'static [&'static str] = &[
        "feeds",
        "refresh_interval_secs",
        "fetch_timeout_secs",
        "user_agent",
        "database",
        "listen",
        "timezone",
        "page_size",
        "feed_size",
        "channel_title",
        "channel_link",
        "channel_description",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            feeds = config.feeds.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn reference_timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }

    /// Interval between passes; never shorter than one second.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    /// Configured feeds that are valid http(s) URLs, in order, without duplicates.
    pub fn valid_feeds(&self) -> Vec<String> {
        let mut feeds: Vec<String> = Vec::with_capacity(self.feeds.len());
        for raw in &self.feeds {
            let raw = raw.trim();
            match validate_feed_url(raw) {
                Ok(_) if feeds.iter().any(|f| f == raw) => {
                    tracing::warn!(feed = %raw, "Duplicate feed URL in config, ignoring");
                }
                Ok(_) => feeds.push(raw.to_string()),
                Err(e) => {
                    tracing::warn!(feed = %raw, error = %e, "Skipping invalid feed URL");
                }
            }
        }
        feeds
    }
}

// ============================================================================
// Tests
// ============================================================================
