use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One feed fetch that produced at least one new item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatedFeed {
    pub url: String,
    pub website: String,
    pub title: String,
    pub description: String,
    pub last_update: DateTime<Utc>,
    /// Newest first; the first item carries the highest id.
    pub items: Vec<UpdatedFeedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatedFeedItem {
    pub id: u64,
    pub title: String,
    pub link: String,
    pub permalink: String,
    pub pub_date: DateTime<Utc>,
    pub body: String,
}

impl UpdatedFeed {
    pub fn new(url: &str, website: &str, title: &str, description: &str) -> Self {
        Self {
            url: url.to_string(),
            website: website.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            last_update: Utc::now(),
            items: Vec::new(),
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}
