use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderValue, ETAG, FROM, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use reqwest::{Client, StatusCode};

use crate::app::{ConfluenceError, Result};
use crate::fetcher::{HttpClient, HttpOutcome};

pub const USER_AGENT: &str = concat!(
    "confluence/",
    env!("CARGO_PKG_VERSION"),
    " (river-of-news aggregator)"
);
pub const FROM_ADDRESS: &str = "confluence-aggregator@users.noreply.github.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut identity = HeaderMap::new();
        identity.insert(FROM, HeaderValue::from_static(FROM_ADDRESS));

        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(USER_AGENT)
            .default_headers(identity)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for HttpFetcher {
    async fn get(
        &self,
        url: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<HttpOutcome> {
        let mut headers = HeaderMap::new();

        if let Some(etag) = etag {
            if let Ok(value) = HeaderValue::from_str(etag) {
                headers.insert(IF_NONE_MATCH, value);
            }
        }

        if let Some(last_modified) = last_modified {
            if let Ok(value) = HeaderValue::from_str(last_modified) {
                headers.insert(IF_MODIFIED_SINCE, value);
            }
        }

        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            return Ok(HttpOutcome::NotModified);
        }

        if !status.is_success() {
            return Err(ConfluenceError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response.bytes().await?.to_vec();

        Ok(HttpOutcome::Content {
            body,
            etag,
            last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::Router;
    use std::sync::{Arc, Mutex};

    const ETAG_V1: &str = "\"feed-v1\"";
    const LAST_MODIFIED_V1: &str = "Mon, 01 Jan 2024 00:00:00 GMT";

    #[derive(Clone, Default)]
    struct Seen {
        requests: Arc<Mutex<Vec<AxumHeaders>>>,
    }

    async fn feed_handler(State(seen): State<Seen>, headers: AxumHeaders) -> Response {
        seen.requests.lock().unwrap().push(headers.clone());

        let matches = headers
            .get("if-none-match")
            .and_then(|v| v.to_str().ok())
            == Some(ETAG_V1);
        if matches {
            return AxumStatus::NOT_MODIFIED.into_response();
        }

        (
            AxumStatus::OK,
            [("etag", ETAG_V1), ("last-modified", LAST_MODIFIED_V1)],
            "<rss version=\"2.0\"><channel><title>T</title></channel></rss>",
        )
            .into_response()
    }

    async fn missing_handler() -> Response {
        AxumStatus::NOT_FOUND.into_response()
    }

    async fn spawn_test_server(seen: Seen) -> (String, tokio::task::JoinHandle<()>) {
        let app = Router::new()
            .route("/feed.xml", get(feed_handler))
            .route("/missing.xml", get(missing_handler))
            .with_state(seen);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", address), handle)
    }

    #[tokio::test]
    async fn test_conditional_get_round_trip() {
        let seen = Seen::default();
        let (base, server) = spawn_test_server(seen.clone()).await;
        let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT).unwrap();
        let url = format!("{}/feed.xml", base);

        let first = fetcher.get(&url, None, None).await.unwrap();
        let (etag, last_modified) = match first {
            HttpOutcome::Content {
                body,
                etag,
                last_modified,
            } => {
                assert!(body.starts_with(b"<rss"));
                (etag, last_modified)
            }
            HttpOutcome::NotModified => panic!("first fetch should return content"),
        };
        assert_eq!(etag.as_deref(), Some(ETAG_V1));
        assert_eq!(last_modified.as_deref(), Some(LAST_MODIFIED_V1));

        let second = fetcher
            .get(&url, etag.as_deref(), last_modified.as_deref())
            .await
            .unwrap();
        assert!(matches!(second, HttpOutcome::NotModified));

        let requests = seen.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1].get("if-modified-since").unwrap(),
            LAST_MODIFIED_V1
        );

        server.abort();
    }

    #[tokio::test]
    async fn test_identity_headers_sent() {
        let seen = Seen::default();
        let (base, server) = spawn_test_server(seen.clone()).await;
        let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT).unwrap();

        fetcher
            .get(&format!("{}/feed.xml", base), None, None)
            .await
            .unwrap();

        let requests = seen.requests.lock().unwrap().clone();
        assert_eq!(requests[0].get("user-agent").unwrap(), USER_AGENT);
        assert_eq!(requests[0].get("from").unwrap(), FROM_ADDRESS);

        server.abort();
    }

    #[tokio::test]
    async fn test_error_status_is_error() {
        let (base, server) = spawn_test_server(Seen::default()).await;
        let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT).unwrap();

        let err = fetcher
            .get(&format!("{}/missing.xml", base), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfluenceError::HttpStatus { status: 404, .. }));

        server.abort();
    }

    #[tokio::test]
    async fn test_connection_refused_is_error() {
        // Grab a free port, then close it again
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        let result = fetcher
            .get(&format!("http://{}/feed.xml", address), None, None)
            .await;
        assert!(matches!(result, Err(ConfluenceError::Http(_))));
    }
}
