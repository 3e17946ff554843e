//! Per-river update log and item id counter.
//!
//! Both live in the river's bucket: the counter under `counter` as a decimal
//! string, the log under `river` as a JSON array, newest record first.

use std::sync::Arc;

use crate::domain::{UpdatedFeed, UpdatedFeedItem};
use crate::store::{ReadTx, Store, StoreError, StoreExt, StoreResult};

const COUNTER_KEY: &str = "counter";
const LOG_KEY: &str = "river";

pub const DEFAULT_MAX_ITEMS: usize = 5;
pub const DEFAULT_MAX_FEED_UPDATES: usize = 100;

#[derive(Clone)]
pub struct UpdateLog {
    store: Arc<dyn Store>,
    max_items: usize,
    max_feed_updates: usize,
}

impl UpdateLog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_limits(store, DEFAULT_MAX_ITEMS, DEFAULT_MAX_FEED_UPDATES)
    }

    pub fn with_limits(store: Arc<dyn Store>, max_items: usize, max_feed_updates: usize) -> Self {
        Self {
            store,
            max_items,
            max_feed_updates,
        }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Sets `item.id` to the river's previous highest id plus one.
    ///
    /// Ids are strictly increasing and survive restarts; nothing is written
    /// and `item` is untouched if the transaction fails.
    pub fn assign_next_id(&self, river: &str, item: &mut UpdatedFeedItem) -> StoreResult<()> {
        let next = self.store.write(|tx| {
            let next = read_counter(&*tx, river)? + 1;
            tx.put(river, COUNTER_KEY, next.to_string().as_bytes())?;
            Ok(next)
        })?;

        item.id = next;
        Ok(())
    }

    /// Prepends `record` to the river's log, keeping at most
    /// `max_feed_updates` records and `max_items` items in the new record.
    pub fn append_update(&self, river: &str, mut record: UpdatedFeed) -> StoreResult<()> {
        record.items.truncate(self.max_items);

        self.store.write(|tx| {
            let mut updates = read_log(&*tx, river)?;
            updates.insert(0, record.clone());
            updates.truncate(self.max_feed_updates);

            let encoded = serde_json::to_vec(&updates).map_err(|e| corrupt(river, LOG_KEY, e))?;
            tx.put(river, LOG_KEY, &encoded)
        })
    }

    /// The river's log, newest record first.
    pub fn updates(&self, river: &str) -> StoreResult<Vec<UpdatedFeed>> {
        self.store.read(|tx| read_log(tx, river))
    }

    /// Highest id handed out so far for `river` (0 when none).
    pub fn counter(&self, river: &str) -> StoreResult<u64> {
        self.store.read(|tx| read_counter(tx, river))
    }
}

fn read_counter<T: ReadTx + ?Sized>(tx: &T, river: &str) -> StoreResult<u64> {
    match tx.get(river, COUNTER_KEY)? {
        None => Ok(0),
        Some(raw) => std::str::from_utf8(&raw)
            .map_err(|e| corrupt(river, COUNTER_KEY, e))?
            .parse::<u64>()
            .map_err(|e| corrupt(river, COUNTER_KEY, e)),
    }
}

fn read_log<T: ReadTx + ?Sized>(tx: &T, river: &str) -> StoreResult<Vec<UpdatedFeed>> {
    match tx.get(river, LOG_KEY)? {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_slice(&raw).map_err(|e| corrupt(river, LOG_KEY, e)),
    }
}

fn corrupt(bucket: &str, key: &str, reason: impl ToString) -> StoreError {
    StoreError::Corrupt {
        bucket: bucket.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
