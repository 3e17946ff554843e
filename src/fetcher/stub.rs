//! Scripted [`HttpClient`] for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::{ConfluenceError, Result};
use crate::fetcher::{HttpClient, HttpOutcome};

#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Replays queued responses per URL; an exhausted queue answers 304.
#[derive(Default)]
pub struct StubClient {
    script: Mutex<HashMap<String, VecDeque<std::result::Result<HttpOutcome, String>>>>,
    requests: Mutex<Vec<Request>>,
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, body: &str, etag: Option<&str>, last_modified: Option<&str>) {
        self.push(
            url,
            Ok(HttpOutcome::Content {
                body: body.as_bytes().to_vec(),
                etag: etag.map(String::from),
                last_modified: last_modified.map(String::from),
            }),
        );
    }

    pub fn not_modified(&self, url: &str) {
        self.push(url, Ok(HttpOutcome::NotModified));
    }

    pub fn fail(&self, url: &str, reason: &str) {
        self.push(url, Err(reason.to_string()));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    fn push(&self, url: &str, response: std::result::Result<HttpOutcome, String>) {
        self.script
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }
}

#[async_trait]
impl HttpClient for StubClient {
    async fn get(
        &self,
        url: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<HttpOutcome> {
        self.requests.lock().unwrap().push(Request {
            url: url.to_string(),
            etag: etag.map(String::from),
            last_modified: last_modified.map(String::from),
        });

        let next = self
            .script
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|queue| queue.pop_front());

        match next {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(reason)) => Err(ConfluenceError::Other(reason)),
            None => Ok(HttpOutcome::NotModified),
        }
    }
}

/// Minimal RSS document with one `<item>` per `(guid, title)`.
pub fn rss(items: &[(&str, &str)]) -> String {
    let entries: String = items
        .iter()
        .map(|(guid, title)| {
            format!(
                "<item><title>{}</title><link>https://example.com/{}</link><guid>{}</guid>\
                 <description>About {}</description></item>",
                title, guid, guid, title
            )
        })
        .collect();

    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>Example</title>\
         <link>https://example.com/</link><description>Example feed</description>{}\
         </channel></rss>",
        entries
    )
}
