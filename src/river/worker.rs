use tokio::sync::mpsc;

use crate::fetcher::{FetchResult, Fetcher};

/// Drains a river's fetch queue one URL at a time.
///
/// Every request ends in exactly one posted result. Errors are logged and
/// posted as a result without a feed, so the coordinator handles them like
/// an unchanged feed and the URL keeps being polled.
pub async fn run(
    river: String,
    fetcher: Fetcher,
    mut queue: mpsc::Receiver<String>,
    results: mpsc::Sender<FetchResult>,
) {
    while let Some(url) = queue.recv().await {
        let result = match fetcher.fetch(&river, &url).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(river = %river, url = %url, "Fetch failed: {}", e);
                FetchResult::empty(&url)
            }
        };

        if results.send(result).await.is_err() {
            break;
        }
    }

    tracing::debug!(river = %river, "Fetch worker stopped");
}
