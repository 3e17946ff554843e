//! River.js rendering of a river snapshot.
//!
//! The document has two top-level keys, `metadata` and
//! `updatedFeeds.updatedFeed`, with camel-cased fields and every value a
//! string, so existing River.js clients can read it unchanged.

use serde::Serialize;

use crate::app::Result;
use crate::domain::{UpdatedFeed, UpdatedFeedItem};
use crate::fetcher::http_fetcher::USER_AGENT;
use crate::river::RiverSnapshot;
use crate::text::{format_gmt, format_local};

/// JSONP callback River.js clients expect.
pub const DEFAULT_CALLBACK: &str = "onGetRiverStream";

const RIVER_JS_DOCS: &str = "http://riverjs.org/";

#[derive(Serialize)]
struct RiverJs<'a> {
    metadata: Metadata<'a>,
    #[serde(rename = "updatedFeeds")]
    updated_feeds: UpdatedFeeds<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Metadata<'a> {
    name: &'a str,
    title: &'a str,
    description: &'a str,
    aggregator: &'a str,
    aggregator_docs: &'a str,
    docs: &'a str,
    ct_builds: String,
    #[serde(rename = "whenGMT")]
    when_gmt: String,
    when_local: String,
    #[serde(rename = "whenStartedGMT")]
    when_started_gmt: String,
    when_started_local: String,
}

#[derive(Serialize)]
struct UpdatedFeeds<'a> {
    #[serde(rename = "updatedFeed")]
    updated_feed: Vec<FeedJs<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedJs<'a> {
    feed_url: &'a str,
    website_url: &'a str,
    feed_title: &'a str,
    feed_description: &'a str,
    when_last_update: String,
    item: Vec<ItemJs<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemJs<'a> {
    body: &'a str,
    perma_link: &'a str,
    pub_date: String,
    title: &'a str,
    link: &'a str,
    id: String,
}

impl<'a> From<&'a UpdatedFeed> for FeedJs<'a> {
    fn from(feed: &'a UpdatedFeed) -> Self {
        Self {
            feed_url: &feed.url,
            website_url: &feed.website,
            feed_title: &feed.title,
            feed_description: &feed.description,
            when_last_update: format_gmt(&feed.last_update),
            item: feed.items.iter().map(ItemJs::from).collect(),
        }
    }
}

impl<'a> From<&'a UpdatedFeedItem> for ItemJs<'a> {
    fn from(item: &'a UpdatedFeedItem) -> Self {
        Self {
            body: &item.body,
            perma_link: &item.permalink,
            pub_date: format_gmt(&item.pub_date),
            title: &item.title,
            link: &item.link,
            id: item.id.to_string(),
        }
    }
}

/// Renders `snapshot` as River.js JSON, wrapped in `callback(...)` when a
/// callback name is given.
pub fn river_js(snapshot: &RiverSnapshot, callback: Option<&str>) -> Result<String> {
    let doc = RiverJs {
        metadata: Metadata {
            name: &snapshot.name,
            title: &snapshot.title,
            description: &snapshot.description,
            aggregator: USER_AGENT,
            aggregator_docs: env!("CARGO_PKG_HOMEPAGE"),
            docs: RIVER_JS_DOCS,
            ct_builds: snapshot.builds.to_string(),
            when_gmt: format_gmt(&snapshot.generated_at),
            when_local: format_local(&snapshot.generated_at),
            when_started_gmt: format_gmt(&snapshot.started_at),
            when_started_local: format_local(&snapshot.started_at),
        },
        updated_feeds: UpdatedFeeds {
            updated_feed: snapshot.updates.iter().map(FeedJs::from).collect(),
        },
    };

    let json = serde_json::to_string_pretty(&doc)?;

    Ok(match callback {
        Some(name) => format!("{}({})", name, json),
        None => json,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snapshot() -> RiverSnapshot {
        let when = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut feed = UpdatedFeed::new(
            "https://example.com/feed.xml",
            "https://example.com/",
            "Example",
            "Example feed",
        );
        feed.last_update = when;
        feed.items.push(UpdatedFeedItem {
            id: 42,
            title: "Hello".into(),
            link: "https://example.com/hello".into(),
            permalink: "hello-guid".into(),
            pub_date: when,
            body: "Hello there".into(),
        });

        RiverSnapshot {
            name: "tech".into(),
            title: "Tech".into(),
            description: "Tech news".into(),
            builds: 7,
            started_at: when,
            generated_at: when,
            updates: vec![feed],
        }
    }

    #[test]
    fn test_river_js_shape() {
        let json = river_js(&snapshot(), None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let metadata = &value["metadata"];
        assert_eq!(metadata["name"], "tech");
        assert_eq!(metadata["ctBuilds"], "7");
        assert_eq!(metadata["whenGMT"], "Mon, 01 Jan 2024 12:00:00 GMT");
        assert_eq!(metadata["whenStartedGMT"], "Mon, 01 Jan 2024 12:00:00 GMT");
        assert_eq!(metadata["aggregator"], USER_AGENT);
        assert!(metadata["aggregatorDocs"]
            .as_str()
            .unwrap()
            .starts_with("https://"));

        let feed = &value["updatedFeeds"]["updatedFeed"][0];
        assert_eq!(feed["feedUrl"], "https://example.com/feed.xml");
        assert_eq!(feed["websiteUrl"], "https://example.com/");
        assert_eq!(feed["feedTitle"], "Example");
        assert_eq!(feed["whenLastUpdate"], "Mon, 01 Jan 2024 12:00:00 GMT");

        let item = &feed["item"][0];
        assert_eq!(item["id"], "42");
        assert_eq!(item["permaLink"], "hello-guid");
        assert_eq!(item["pubDate"], "Mon, 01 Jan 2024 12:00:00 GMT");
        assert_eq!(item["body"], "Hello there");
    }

    #[test]
    fn test_callback_wraps_json() {
        let out = river_js(&snapshot(), Some(DEFAULT_CALLBACK)).unwrap();
        assert!(out.starts_with("onGetRiverStream({"));
        assert!(out.ends_with("})"));

        let inner = &out["onGetRiverStream(".len()..out.len() - 1];
        assert!(serde_json::from_str::<serde_json::Value>(inner).is_ok());
    }

    #[test]
    fn test_empty_river() {
        let mut empty = snapshot();
        empty.updates.clear();

        let value: serde_json::Value =
            serde_json::from_str(&river_js(&empty, None).unwrap()).unwrap();
        assert_eq!(value["updatedFeeds"]["updatedFeed"], serde_json::json!([]));
    }
}
