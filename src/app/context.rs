use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::app::error::Result;
use crate::config::{ConfigError, DEFAULT_QUEUE_SIZE};
use crate::fetcher::http_fetcher::{HttpFetcher, DEFAULT_TIMEOUT};
use crate::fetcher::{Fetcher, HttpClient};
use crate::parser::FeedRsParser;
use crate::scheduler::PollPolicy;
use crate::store::update_log::{DEFAULT_MAX_FEED_UPDATES, DEFAULT_MAX_ITEMS};
use crate::store::{CacheHeaderStore, FingerprintLedger, SqliteStore, Store, UpdateLog};
use crate::text::DEFAULT_MAX_BODY_CHARS;

/// Runtime knobs shared by every river.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub quick_start: bool,
    pub poll: PollPolicy,
    pub max_items: usize,
    pub max_feed_updates: usize,
    pub max_body_chars: usize,
    pub queue_size: usize,
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quick_start: false,
            poll: PollPolicy::default(),
            max_items: DEFAULT_MAX_ITEMS,
            max_feed_updates: DEFAULT_MAX_FEED_UPDATES,
            max_body_chars: DEFAULT_MAX_BODY_CHARS,
            queue_size: DEFAULT_QUEUE_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct AppContext {
    pub store: Arc<dyn Store>,
    pub client: Arc<dyn HttpClient>,
    pub fetcher: Fetcher,
    pub settings: Settings,
}

impl AppContext {
    pub fn new(db_path: Option<PathBuf>, settings: Settings) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store: Arc<dyn Store> = Arc::new(SqliteStore::new(&db_path)?);
        let client: Arc<dyn HttpClient> = Arc::new(HttpFetcher::new(settings.timeout)?);
        tracing::debug!(path = %db_path.display(), "Opened store");

        Ok(Self::with_client(store, client, settings))
    }

    pub fn in_memory(settings: Settings) -> Result<Self> {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory()?);
        let client: Arc<dyn HttpClient> = Arc::new(HttpFetcher::new(settings.timeout)?);
        Ok(Self::with_client(store, client, settings))
    }

    pub fn with_client(
        store: Arc<dyn Store>,
        client: Arc<dyn HttpClient>,
        settings: Settings,
    ) -> Self {
        let fetcher = Fetcher::new(
            client.clone(),
            Arc::new(FeedRsParser::new()),
            CacheHeaderStore::new(store.clone()),
        );

        Self {
            store,
            client,
            fetcher,
            settings,
        }
    }

    pub fn ledger(&self) -> FingerprintLedger {
        FingerprintLedger::new(self.store.clone())
    }

    pub fn update_log(&self) -> UpdateLog {
        UpdateLog::with_limits(
            self.store.clone(),
            self.settings.max_items,
            self.settings.max_feed_updates,
        )
    }

    /// `<data dir>/confluence/confluence.db`
    pub fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        let confluence_dir = data_dir.join("confluence");
        std::fs::create_dir_all(&confluence_dir)?;
        Ok(confluence_dir.join("confluence.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{UpdatedFeed, UpdatedFeedItem};
    use chrono::Utc;

    #[test]
    fn test_update_log_uses_configured_limits() {
        let settings = Settings {
            max_items: 2,
            max_feed_updates: 1,
            ..Settings::default()
        };
        let ctx = AppContext::in_memory(settings).unwrap();
        ctx.store.create_bucket_if_absent("tech").unwrap();

        let log = ctx.update_log();
        for url in ["https://a.example.com/", "https://b.example.com/"] {
            let mut record = UpdatedFeed::new(url, "", "", "");
            record.items = (0..3)
                .map(|i| UpdatedFeedItem {
                    id: i,
                    title: String::new(),
                    link: String::new(),
                    permalink: String::new(),
                    pub_date: Utc::now(),
                    body: String::new(),
                })
                .collect();
            log.append_update("tech", record).unwrap();
        }

        let updates = log.updates("tech").unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].url, "https://b.example.com/");
        assert_eq!(updates[0].items.len(), 2);
    }

    #[test]
    fn test_opens_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confluence.db");

        let ctx = AppContext::new(Some(path.clone()), Settings::default()).unwrap();
        ctx.store.create_bucket_if_absent("tech").unwrap();
        assert!(path.exists());
    }
}
