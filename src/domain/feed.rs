use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A parsed web feed, independent of its wire format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feed {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Entries in document order (usually newest first).
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedItem {
    pub guid: String,
    pub link: String,
    pub title: String,
    pub published: Option<DateTime<Utc>>,
    pub description: String,
    pub content: String,
}

impl FeedItem {
    /// The stable identity of this item within its feed, if it has one.
    ///
    /// GUID wins over link; items carrying neither have no identity.
    pub fn identity(&self) -> Option<&str> {
        if !self.guid.is_empty() {
            Some(&self.guid)
        } else if !self.link.is_empty() {
            Some(&self.link)
        } else {
            None
        }
    }

    /// Description, falling back to full content.
    pub fn display_body(&self) -> &str {
        if self.description.is_empty() {
            &self.content
        } else {
            &self.description
        }
    }
}
