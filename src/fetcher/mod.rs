pub mod feed_fetcher;
pub mod http_fetcher;

#[cfg(test)]
pub(crate) mod stub;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::Feed;

pub use feed_fetcher::Fetcher;
pub use http_fetcher::HttpFetcher;

#[derive(Debug, Clone)]
pub enum HttpOutcome {
    /// New content fetched successfully
    Content {
        body: Vec<u8>,
        etag: Option<String>,
        last_modified: Option<String>,
    },
    /// Content not modified (HTTP 304)
    NotModified,
}

/// One conditional GET. Non-2xx statuses other than 304 are errors.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<HttpOutcome>;
}

/// Outcome of fetching one feed, handed to the river for processing.
///
/// `feed` is `None` for "not modified" and for fetches that failed; both
/// count as zero new items.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: String,
    pub feed: Option<Feed>,
}

impl FetchResult {
    pub fn empty(url: &str) -> Self {
        Self {
            url: url.to_string(),
            feed: None,
        }
    }
}
