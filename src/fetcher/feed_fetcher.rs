use std::sync::Arc;

use crate::app::Result;
use crate::fetcher::{FetchResult, HttpClient, HttpOutcome};
use crate::parser::FeedParser;
use crate::store::{CacheHeaderStore, CacheHeaders};

/// Conditional GET + parse for one feed of one river.
#[derive(Clone)]
pub struct Fetcher {
    client: Arc<dyn HttpClient>,
    parser: Arc<dyn FeedParser>,
    cache_headers: CacheHeaderStore,
}

impl Fetcher {
    pub fn new(
        client: Arc<dyn HttpClient>,
        parser: Arc<dyn FeedParser>,
        cache_headers: CacheHeaderStore,
    ) -> Self {
        Self {
            client,
            parser,
            cache_headers,
        }
    }

    /// Fetches `url` on behalf of `river`.
    ///
    /// Sends the stored validators, so an unchanged feed costs a 304 and
    /// yields a result without a feed. Transport, status and parse failures
    /// are returned as errors and leave the stored validators untouched; the
    /// validators are only replaced once a body has parsed.
    pub async fn fetch(&self, river: &str, url: &str) -> Result<FetchResult> {
        let cached = self.cache_headers.load(river, url).unwrap_or_else(|e| {
            tracing::warn!(river = %river, url = %url, "Could not load cache headers: {}", e);
            CacheHeaders::default()
        });

        tracing::debug!(river = %river, url = %url, "Fetching feed");

        let outcome = self
            .client
            .get(url, cached.etag.as_deref(), cached.last_modified.as_deref())
            .await?;

        match outcome {
            HttpOutcome::NotModified => {
                tracing::debug!(river = %river, url = %url, "Feed not modified");
                Ok(FetchResult::empty(url))
            }
            HttpOutcome::Content {
                body,
                etag,
                last_modified,
            } => {
                let feed = self.parser.parse(&body)?;

                let headers = CacheHeaders {
                    last_modified,
                    etag,
                };
                if let Err(e) = self.cache_headers.save(river, url, &headers) {
                    tracing::warn!(river = %river, url = %url, "Could not save cache headers: {}", e);
                }

                Ok(FetchResult {
                    url: url.to_string(),
                    feed: Some(feed),
                })
            }
        }
    }
}
