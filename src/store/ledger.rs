//! Fingerprint ledger: the "have we seen this item before" oracle.
//!
//! Fingerprints live in the river's own bucket and are never deleted, so the
//! ledger only ever grows.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::FeedItem;
use crate::store::{Store, StoreExt, StoreResult};

const SEEN_MARKER: &[u8] = &[1];

/// Dedup key for one item of one feed in one river: `river:feed_url:guid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Builds the key from the item's GUID, else its link.
    ///
    /// Items with neither get a random token, so they can never be matched
    /// against an earlier fetch and always count as new.
    pub fn new(river: &str, feed_url: &str, item: &FeedItem) -> Self {
        let guid = match item.identity() {
            Some(identity) => identity.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        Self(format!("{}:{}:{}", river, feed_url, guid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone)]
pub struct FingerprintLedger {
    store: Arc<dyn Store>,
}

impl FingerprintLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Returns whether `fingerprint` was already recorded for `river`,
    /// recording it in the same transaction when it was not.
    ///
    /// A store failure is logged and reported as "not seen": a duplicate in
    /// the river is preferable to a silently lost item.
    pub fn seen(&self, river: &str, fingerprint: &Fingerprint) -> bool {
        match self.check_and_set(river, fingerprint) {
            Ok(seen) => seen,
            Err(e) => {
                tracing::warn!(
                    river = %river,
                    fingerprint = %fingerprint,
                    "Fingerprint check failed, treating item as new: {}",
                    e
                );
                false
            }
        }
    }

    fn check_and_set(&self, river: &str, fingerprint: &Fingerprint) -> StoreResult<bool> {
        self.store.write(|tx| {
            if tx.get(river, fingerprint.as_str())?.is_some() {
                return Ok(true);
            }
            tx.put(river, fingerprint.as_str(), SEEN_MARKER)?;
            Ok(false)
        })
    }
}
