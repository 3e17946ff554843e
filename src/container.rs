//! All running rivers, and the reconciliation of them against a config.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::app::{AppContext, ConfluenceError, Result};
use crate::config::{Config, RiverConfig};
use crate::fetcher::HttpClient;
use crate::opml;
use crate::river::{RiverHandle, RiverInfo};

/// Resolves the feed URLs a river should track: its `feeds` list, or the
/// outlines of its OPML document.
pub async fn resolve_feeds(client: &dyn HttpClient, river: &RiverConfig) -> Result<Vec<String>> {
    match &river.opml {
        Some(url) => {
            let urls = opml::fetch_feed_urls(client, url).await?;
            tracing::debug!(river = %river.name, url = %url, feeds = urls.len(), "Expanded OPML");
            Ok(urls)
        }
        None => Ok(river.feeds.clone()),
    }
}

pub struct Container {
    ctx: Arc<AppContext>,
    rivers: BTreeMap<String, RiverHandle>,
}

impl Container {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            ctx,
            rivers: BTreeMap::new(),
        }
    }

    /// Starts every river in `config`.
    pub async fn start(ctx: Arc<AppContext>, config: &Config) -> Result<Self> {
        let mut container = Self::new(ctx);
        for river in &config.rivers {
            container.start_river(river).await?;
        }
        Ok(container)
    }

    /// Brings the running rivers in line with `config`.
    ///
    /// Configured rivers that are running get their feed set reconciled;
    /// new ones are started. A river whose OPML cannot be fetched keeps the
    /// feeds it has. Rivers missing from `config` keep running unchanged.
    pub async fn apply(&mut self, config: &Config) -> Result<()> {
        for river in &config.rivers {
            if !self.rivers.contains_key(&river.name) {
                self.start_river(river).await?;
                continue;
            }

            let urls = match resolve_feeds(self.ctx.client.as_ref(), river).await {
                Ok(urls) => urls,
                Err(e) => {
                    tracing::warn!(
                        river = %river.name,
                        "Could not resolve feeds, keeping current set: {}",
                        e
                    );
                    continue;
                }
            };

            let summary = match self.river(&river.name)?.reconcile(urls).await {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::error!(river = %river.name, "Could not reconcile feeds: {}", e);
                    continue;
                }
            };
            if !summary.is_empty() {
                tracing::info!(
                    river = %river.name,
                    added = summary.added.len(),
                    removed = summary.removed.len(),
                    "Reconciled feeds"
                );
            }
        }

        for name in self.rivers.keys() {
            if config.river(name).is_none() {
                tracing::warn!(river = %name, "River no longer configured, leaving it running");
            }
        }

        Ok(())
    }

    async fn start_river(&mut self, river: &RiverConfig) -> Result<()> {
        let urls = match resolve_feeds(self.ctx.client.as_ref(), river).await {
            Ok(urls) => urls,
            Err(e) => {
                tracing::error!(
                    river = %river.name,
                    "Could not resolve feeds, starting with none: {}",
                    e
                );
                Vec::new()
            }
        };

        let info = RiverInfo::new(&river.name, river.display_title(), &river.description);
        let handle = RiverHandle::spawn(&self.ctx, info, urls)?;
        self.rivers.insert(river.name.clone(), handle);
        Ok(())
    }

    pub fn river(&self, name: &str) -> Result<&RiverHandle> {
        self.rivers
            .get(name)
            .ok_or_else(|| ConfluenceError::RiverNotFound(name.to_string()))
    }

    /// Running rivers, by name.
    pub fn rivers(&self) -> impl Iterator<Item = &RiverHandle> {
        self.rivers.values()
    }

    pub async fn shutdown(&self) {
        for river in self.rivers.values() {
            river.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Settings;
    use crate::fetcher::stub::StubClient;
    use crate::store::SqliteStore;

    const A: &str = "https://a.example.com/feed.xml";
    const B: &str = "https://b.example.com/feed.xml";
    const C: &str = "https://c.example.com/feed.xml";
    const LIST: &str = "https://example.com/list.opml";

    fn context(client: Arc<StubClient>) -> Arc<AppContext> {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        Arc::new(AppContext::with_client(store, client, Settings::default()))
    }

    fn river(name: &str, feeds: &[&str]) -> RiverConfig {
        RiverConfig {
            name: name.to_string(),
            title: String::new(),
            description: String::new(),
            feeds: feeds.iter().map(|f| f.to_string()).collect(),
            opml: None,
        }
    }

    fn opml_river(name: &str) -> RiverConfig {
        RiverConfig {
            feeds: Vec::new(),
            opml: Some(LIST.to_string()),
            ..river(name, &[])
        }
    }

    fn config(rivers: Vec<RiverConfig>) -> Config {
        Config {
            rivers,
            ..Config::default()
        }
    }

    fn opml_listing(urls: &[&str]) -> String {
        let urls: Vec<String> = urls.iter().map(|u| u.to_string()).collect();
        opml::feeds_opml("list", &urls)
    }

    fn strings(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_lookup() {
        let ctx = context(Arc::new(StubClient::new()));
        let container = Container::start(ctx, &config(vec![river("tech", &[A, B])]))
            .await
            .unwrap();

        let tech = container.river("tech").unwrap();
        assert_eq!(tech.info().title, "tech");
        assert_eq!(tech.streams().await.unwrap(), strings(&[A, B]));
        assert!(matches!(
            container.river("missing"),
            Err(ConfluenceError::RiverNotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_reconciles_and_starts_new_rivers() {
        let ctx = context(Arc::new(StubClient::new()));
        let mut container = Container::start(ctx, &config(vec![river("tech", &[A, B])]))
            .await
            .unwrap();

        container
            .apply(&config(vec![river("tech", &[B, C]), river("news", &[A])]))
            .await
            .unwrap();

        assert_eq!(
            container.river("tech").unwrap().streams().await.unwrap(),
            strings(&[B, C])
        );
        assert_eq!(
            container.river("news").unwrap().streams().await.unwrap(),
            strings(&[A])
        );
        assert_eq!(container.rivers().count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_river_does_not_block_others() {
        let ctx = context(Arc::new(StubClient::new()));
        let mut container = Container::start(
            ctx,
            &config(vec![river("tech", &[A]), river("news", &[B])]),
        )
        .await
        .unwrap();
        container.river("tech").unwrap().shutdown().await;

        container
            .apply(&config(vec![river("tech", &[A, C]), river("news", &[B, C])]))
            .await
            .unwrap();

        assert_eq!(
            container.river("news").unwrap().streams().await.unwrap(),
            strings(&[B, C])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_river_keeps_running() {
        let ctx = context(Arc::new(StubClient::new()));
        let mut container = Container::start(ctx, &config(vec![river("tech", &[A])]))
            .await
            .unwrap();

        container.apply(&config(Vec::new())).await.unwrap();

        assert_eq!(
            container.river("tech").unwrap().streams().await.unwrap(),
            strings(&[A])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_opml_river_expands_and_survives_failure() {
        let client = Arc::new(StubClient::new());
        client.respond(LIST, &opml_listing(&[A, B]), None, None);
        client.fail(LIST, "connection refused");
        client.respond(LIST, &opml_listing(&[C]), None, None);

        let ctx = context(client.clone());
        let cfg = config(vec![opml_river("friends")]);
        let mut container = Container::start(ctx, &cfg).await.unwrap();
        let friends = container.river("friends").unwrap().clone();
        assert_eq!(friends.streams().await.unwrap(), strings(&[A, B]));

        container.apply(&cfg).await.unwrap();
        assert_eq!(friends.streams().await.unwrap(), strings(&[A, B]));

        container.apply(&cfg).await.unwrap();
        assert_eq!(friends.streams().await.unwrap(), strings(&[C]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_opml_starts_empty() {
        let client = Arc::new(StubClient::new());
        client.fail(LIST, "connection refused");

        let ctx = context(client);
        let container = Container::start(ctx, &config(vec![opml_river("friends")]))
            .await
            .unwrap();

        assert!(container
            .river("friends")
            .unwrap()
            .streams()
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_all_rivers() {
        let ctx = context(Arc::new(StubClient::new()));
        let container = Container::start(
            ctx,
            &config(vec![river("tech", &[A]), river("news", &[B])]),
        )
        .await
        .unwrap();

        container.shutdown().await;

        for river in container.rivers() {
            assert!(river.streams().await.is_err());
        }
    }
}
