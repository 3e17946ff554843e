//! Configuration management for Confluence.
//!
//! Configuration is read from `~/.config/confluence/config.toml` unless a
//! path is given on the command line. If the default file doesn't exist, a
//! commented default configuration is created.

pub mod watch;

pub use watch::watch;

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::app::Settings;
use crate::fetcher::http_fetcher::DEFAULT_TIMEOUT;
use crate::scheduler::{PollPolicy, DEFAULT_POLL, DEFAULT_POLL_CHANGE, DEFAULT_POLL_MAX, DEFAULT_POLL_MIN};
use crate::store::update_log::{DEFAULT_MAX_FEED_UPDATES, DEFAULT_MAX_ITEMS};
use crate::text::DEFAULT_MAX_BODY_CHARS;

pub const DEFAULT_QUEUE_SIZE: usize = 64;
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(5);

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Skip the initial fetch of every feed at startup
    pub quick_start: bool,
    /// Database file; defaults to the user data directory
    pub database: Option<PathBuf>,
    pub poll: PollConfig,
    pub limits: LimitsConfig,
    pub fetch: FetchConfig,
    #[serde(rename = "river")]
    pub rivers: Vec<RiverConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub default_secs: u64,
    pub min_secs: u64,
    pub max_secs: u64,
    pub change: f64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            default_secs: DEFAULT_POLL.as_secs(),
            min_secs: DEFAULT_POLL_MIN.as_secs(),
            max_secs: DEFAULT_POLL_MAX.as_secs(),
            change: DEFAULT_POLL_CHANGE,
        }
    }
}

impl PollConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            default: Duration::from_secs(self.default_secs),
            min: Duration::from_secs(self.min_secs),
            max: Duration::from_secs(self.max_secs),
            change: self.change,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Items kept per update record
    pub max_items: usize,
    /// Update records kept per river
    pub max_feed_updates: usize,
    /// Characters of plain text kept per item body
    pub max_body_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            max_feed_updates: DEFAULT_MAX_FEED_UPDATES,
            max_body_chars: DEFAULT_MAX_BODY_CHARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub queue_size: usize,
    /// How often the config file is checked for changes
    pub watch_interval_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            queue_size: DEFAULT_QUEUE_SIZE,
            watch_interval_secs: DEFAULT_WATCH_INTERVAL.as_secs(),
        }
    }
}

impl FetchConfig {
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}

/// One `[[river]]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RiverConfig {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub feeds: Vec<String>,
    /// OPML document listing the river's feeds, used instead of `feeds`
    #[serde(default)]
    pub opml: Option<String>,
}

impl RiverConfig {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default path.
    ///
    /// A missing default config file is created with comments and yields the
    /// default configuration. An explicitly given path must exist. Missing
    /// fields use default values; the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => {
                let config_path = Self::default_config_path()?;
                if !config_path.exists() {
                    Self::create_default_config(&config_path)?;
                    return Ok(Self::default());
                }
                Self::from_path(&config_path)
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/confluence/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("confluence").join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let poll = &self.poll;
        if poll.min_secs == 0 {
            return Err(invalid("poll.min_secs must be at least 1"));
        }
        if !(poll.min_secs <= poll.default_secs && poll.default_secs <= poll.max_secs) {
            return Err(invalid(format!(
                "poll intervals must satisfy min <= default <= max, got {} / {} / {}",
                poll.min_secs, poll.default_secs, poll.max_secs
            )));
        }
        if !(poll.change > 0.0 && poll.change < 1.0) {
            return Err(invalid(format!(
                "poll.change must be between 0 and 1, got {}",
                poll.change
            )));
        }

        let limits = [
            ("limits.max_items", self.limits.max_items),
            ("limits.max_feed_updates", self.limits.max_feed_updates),
            ("limits.max_body_chars", self.limits.max_body_chars),
            ("fetch.queue_size", self.fetch.queue_size),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(invalid(format!("{} must be at least 1", name)));
            }
        }
        if self.fetch.timeout_secs == 0 {
            return Err(invalid("fetch.timeout_secs must be at least 1"));
        }
        if self.fetch.watch_interval_secs == 0 {
            return Err(invalid("fetch.watch_interval_secs must be at least 1"));
        }

        let mut names = HashSet::new();
        for river in &self.rivers {
            if river.name.trim().is_empty() {
                return Err(invalid("river name must not be empty"));
            }
            if !names.insert(river.name.as_str()) {
                return Err(invalid(format!("duplicate river name: {}", river.name)));
            }
            if river.opml.is_some() && !river.feeds.is_empty() {
                return Err(invalid(format!(
                    "river {} sets both feeds and opml",
                    river.name
                )));
            }

            let urls = river.feeds.iter().chain(river.opml.iter());
            for url in urls {
                if let Err(e) = url::Url::parse(url) {
                    return Err(invalid(format!(
                        "river {}: invalid URL {}: {}",
                        river.name, url, e
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn river(&self, name: &str) -> Option<&RiverConfig> {
        self.rivers.iter().find(|r| r.name == name)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            quick_start: self.quick_start,
            poll: self.poll.policy(),
            max_items: self.limits.max_items,
            max_feed_updates: self.limits.max_feed_updates,
            max_body_chars: self.limits.max_body_chars,
            queue_size: self.fetch.queue_size,
            timeout: Duration::from_secs(self.fetch.timeout_secs),
        }
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        tracing::info!(path = %path.display(), "Created default configuration");
        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> &'static str {
        r##"# Confluence configuration
#
# Each [[river]] aggregates a set of feeds into one stream of updates.
# List the feeds directly with `feeds`, or point `opml` at an OPML
# document whose outlines carry `xmlUrl` attributes.
#
# Changes to this file are picked up while `confluence run` is running.

# Skip the initial fetch at startup; every feed waits one poll interval
quick_start = false

# database = "/path/to/confluence.db"

[poll]
# Poll intervals in seconds. Feeds with new items are polled more often,
# quiet feeds less often, always within [min_secs, max_secs].
default_secs = 3600
min_secs = 300
max_secs = 3600
# Fraction of the current interval added or removed after each fetch
change = 0.1

[limits]
# Items kept per update record
max_items = 5
# Update records kept per river
max_feed_updates = 100
# Characters of plain text kept per item body
max_body_chars = 280

[fetch]
timeout_secs = 10
queue_size = 64
watch_interval_secs = 5

# [[river]]
# name = "tech"
# title = "Tech"
# description = "Technology news"
# feeds = [
#     "https://blog.rust-lang.org/feed.xml",
# ]
#
# [[river]]
# name = "friends"
# title = "Friends"
# opml = "https://example.com/friends.opml"
"##
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(reason.into())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Config, ConfigError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        Config::from_path(&path)
    }

    #[test]
    fn test_default_config_deserializes() {
        let config: Config = toml::from_str(Config::default_config_content())
            .expect("Default config should be valid TOML");

        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config() {
        let config = parse("").expect("Empty config should work");

        assert!(!config.quick_start);
        assert_eq!(config.poll.policy(), PollPolicy::default());
        assert_eq!(config.limits.max_items, 5);
        assert_eq!(config.limits.max_feed_updates, 100);
        assert!(config.rivers.is_empty());
    }

    #[test]
    fn test_rivers_and_partial_sections() {
        let config = parse(
            r#"
quick_start = true

[poll]
min_secs = 600

[[river]]
name = "tech"
title = "Tech"
feeds = ["https://a.example.com/feed.xml", "https://b.example.com/feed.xml"]

[[river]]
name = "friends"
opml = "https://example.com/friends.opml"
"#,
        )
        .unwrap();

        assert!(config.quick_start);
        assert_eq!(config.poll.min_secs, 600);
        assert_eq!(config.poll.max_secs, 3600);
        assert_eq!(config.rivers.len(), 2);
        assert_eq!(config.rivers[0].feeds.len(), 2);
        assert_eq!(
            config.river("friends").unwrap().opml.as_deref(),
            Some("https://example.com/friends.opml")
        );
        assert_eq!(config.river("friends").unwrap().display_title(), "friends");
        assert!(config.river("missing").is_none());

        let settings = config.settings();
        assert!(settings.quick_start);
        assert_eq!(settings.poll.min, Duration::from_secs(600));
    }

    #[test]
    fn test_duplicate_river_names_rejected() {
        let err = parse(
            r#"
[[river]]
name = "tech"

[[river]]
name = "tech"
"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn test_bad_intervals_rejected() {
        let err = parse("[poll]\nmin_secs = 4000\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = parse("[poll]\nchange = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = parse("[poll]\nchange = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let err = parse("[limits]\nmax_items = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("max_items")));
    }

    #[test]
    fn test_bad_feed_url_rejected() {
        let err = parse(
            r#"
[[river]]
name = "tech"
feeds = ["not a url"]
"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("not a url")));
    }

    #[test]
    fn test_feeds_and_opml_rejected() {
        let err = parse(
            r#"
[[river]]
name = "tech"
feeds = ["https://a.example.com/feed.xml"]
opml = "https://example.com/list.opml"
"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let err = parse("[[river]\nname = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_explicit_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
