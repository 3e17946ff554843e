use chrono::Utc;
use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{ConfluenceError, Result};
use crate::domain::{Feed, FeedItem};

/// Turns raw feed bytes into a [`Feed`].
pub trait FeedParser: Send + Sync {
    fn parse(&self, body: &[u8]) -> Result<Feed>;
}

/// RSS 0.9x/1.0/2.0, Atom and JSON Feed via feed-rs.
#[derive(Debug, Clone, Default)]
pub struct FeedRsParser;

impl FeedRsParser {
    pub fn new() -> Self {
        Self
    }
}

impl FeedParser for FeedRsParser {
    fn parse(&self, body: &[u8]) -> Result<Feed> {
        // Entries without an id keep an empty guid; identity falls back to the link.
        let feed = parser::Builder::new()
            .id_generator(|_, _, _| String::new())
            .build()
            .parse(body)
            .map_err(|e| ConfluenceError::FeedParse(e.to_string()))?;

        let items = feed
            .entries
            .into_iter()
            .map(|entry| {
                let link = entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .unwrap_or_default();

                FeedItem {
                    guid: entry.id,
                    link,
                    title: entry
                        .title
                        .map(|t| decode_html_entities(&t.content).to_string())
                        .unwrap_or_default(),
                    published: entry
                        .published
                        .or(entry.updated)
                        .map(|dt| dt.with_timezone(&Utc)),
                    description: entry.summary.map(|s| s.content).unwrap_or_default(),
                    content: entry.content.and_then(|c| c.body).unwrap_or_default(),
                }
            })
            .collect();

        Ok(Feed {
            title: feed
                .title
                .map(|t| decode_html_entities(&t.content).to_string())
                .unwrap_or_default(),
            link: feed
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            description: feed
                .description
                .map(|d| decode_html_entities(&d.content).to_string())
                .unwrap_or_default(),
            items,
        })
    }
}
