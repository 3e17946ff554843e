use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;

use crate::domain::{Feed, FeedItem, UpdatedFeed, UpdatedFeedItem};
use crate::fetcher::FetchResult;
use crate::river::{Command, ReconcileSummary, RiverInfo};
use crate::scheduler::{format_interval, Scheduler};
use crate::store::{Fingerprint, FingerprintLedger, UpdateLog};
use crate::text;

/// Mutable state of one river, owned by its coordinator task.
///
/// Everything that changes dedup state, the update log or the feed set goes
/// through here, one message at a time.
pub struct RiverState {
    info: Arc<RiverInfo>,
    streams: HashSet<String>,
    scheduler: Scheduler,
    ledger: FingerprintLedger,
    log: UpdateLog,
    max_body_chars: usize,
}

impl RiverState {
    pub fn new(
        info: Arc<RiverInfo>,
        urls: impl IntoIterator<Item = String>,
        scheduler: Scheduler,
        ledger: FingerprintLedger,
        log: UpdateLog,
        max_body_chars: usize,
    ) -> Self {
        let mut state = Self {
            info,
            streams: HashSet::new(),
            scheduler,
            ledger,
            log,
            max_body_chars,
        };

        for url in urls {
            state.scheduler.track(&url);
            state.streams.insert(url);
        }

        state
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn is_tracking(&self, url: &str) -> bool {
        self.streams.contains(url)
    }

    /// Tracked feed URLs, sorted.
    pub fn streams(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.streams.iter().cloned().collect();
        urls.sort();
        urls
    }

    /// Queues the first round of fetches.
    ///
    /// With `quick_start` nothing is fetched right away; every feed waits
    /// one default interval instead.
    pub fn start(&mut self, quick_start: bool) {
        let urls = self.streams();

        if quick_start {
            tracing::info!(
                river = %self.name(),
                feeds = urls.len(),
                "Quick start, skipping initial fetch"
            );
            let delay = self.scheduler.policy().default;
            for url in &urls {
                self.scheduler.arm(url, delay);
            }
        } else {
            tracing::info!(river = %self.name(), feeds = urls.len(), "Initial fetch");
            for url in &urls {
                self.scheduler.enqueue_now(url);
            }
        }
    }

    /// Dedups, records and reschedules one fetch outcome. Returns the number
    /// of new items found.
    pub fn process_feed(&mut self, result: FetchResult) -> usize {
        self.info.record_build();

        let new_items = match result.feed {
            Some(feed) => self.ingest(&result.url, feed),
            None => 0,
        };

        if self.streams.contains(&result.url) {
            let next = self.scheduler.reschedule(&result.url, new_items);
            tracing::debug!(
                river = %self.name(),
                url = %result.url,
                new_items,
                "Next fetch in {}",
                format_interval(next)
            );
        } else {
            // A timer fired while the feed was being removed
            tracing::info!(
                river = %self.name(),
                url = %result.url,
                "Processed result for a feed no longer tracked"
            );
        }

        new_items
    }

    fn ingest(&mut self, url: &str, feed: Feed) -> usize {
        // Oldest first, so the newest item ends up with the highest id
        let fresh: Vec<&FeedItem> = feed
            .items
            .iter()
            .rev()
            .filter(|item| {
                let fingerprint = Fingerprint::new(self.name(), url, item);
                let seen = self.ledger.seen(self.name(), &fingerprint);
                if !seen {
                    tracing::debug!(river = %self.name(), %fingerprint, "New item");
                }
                !seen
            })
            .collect();

        let new_items = fresh.len();
        if new_items == 0 {
            return 0;
        }

        let mut record = UpdatedFeed::new(url, &feed.link, &feed.title, &feed.description);
        let skip = new_items.saturating_sub(self.log.max_items());

        for item in &fresh[skip..] {
            let mut update = UpdatedFeedItem {
                id: 0,
                title: item.title.clone(),
                link: item.link.clone(),
                permalink: item.guid.clone(),
                pub_date: item.published.unwrap_or_else(Utc::now),
                body: text::body(item.display_body(), self.max_body_chars),
            };

            if let Err(e) = self.log.assign_next_id(self.name(), &mut update) {
                tracing::error!(
                    river = %self.name(),
                    url = %url,
                    "Could not assign item id, dropping item: {}",
                    e
                );
                continue;
            }

            record.items.insert(0, update);
        }

        if record.items.is_empty() {
            return new_items;
        }

        let newest_id = record.items[0].id;
        let title = record.display_title().to_string();

        if let Err(e) = self.log.append_update(self.name(), record) {
            tracing::error!(river = %self.name(), url = %url, "Could not append update: {}", e);
            return new_items;
        }

        tracing::info!(
            river = %self.name(),
            url = %url,
            counter = newest_id,
            "Added {} new item(s) from {}",
            new_items,
            title
        );

        new_items
    }

    /// Makes the tracked feed set equal to `desired`.
    ///
    /// New feeds are fetched right away; dropped feeds lose their timer and
    /// interval. A dropped feed whose timer already fired may still deliver
    /// one last result, which is processed but not rescheduled.
    pub fn reconcile(&mut self, desired: &[String]) -> ReconcileSummary {
        let desired: HashSet<&str> = desired.iter().map(String::as_str).collect();
        let mut summary = ReconcileSummary::default();

        for url in &desired {
            if self.streams.contains(*url) {
                continue;
            }
            tracing::info!(river = %self.name(), url = %url, "Adding feed");
            self.streams.insert(url.to_string());
            self.scheduler.track(url);
            self.scheduler.enqueue_now(url);
            summary.added.push(url.to_string());
        }

        let removed: Vec<String> = self
            .streams
            .iter()
            .filter(|url| !desired.contains(url.as_str()))
            .cloned()
            .collect();

        for url in removed {
            tracing::info!(river = %self.name(), url = %url, "Removing feed");
            if !self.scheduler.forget(&url) {
                tracing::info!(
                    river = %self.name(),
                    url = %url,
                    "Timer had already fired, a final fetch may still arrive"
                );
            }
            self.streams.remove(&url);
            summary.removed.push(url);
        }

        summary.added.sort();
        summary.removed.sort();
        summary
    }

    /// Coordinator loop: fetch results and control messages, one at a time.
    pub async fn run(
        mut self,
        mut results: mpsc::Receiver<FetchResult>,
        mut control: mpsc::Receiver<Command>,
    ) {
        loop {
            tokio::select! {
                Some(result) = results.recv() => {
                    self.process_feed(result);
                }
                command = control.recv() => match command {
                    Some(Command::Reconcile { urls, reply }) => {
                        let summary = self.reconcile(&urls);
                        let _ = reply.send(summary);
                    }
                    Some(Command::Streams { reply }) => {
                        let _ = reply.send(self.streams());
                    }
                    Some(Command::Shutdown) | None => break,
                },
            }
        }

        tracing::info!(river = %self.name(), "River stopped");
        self.scheduler.shutdown();
    }
}
