pub mod feed;
pub mod update;

pub use feed::{Feed, FeedItem};
pub use update::{UpdatedFeed, UpdatedFeedItem};
