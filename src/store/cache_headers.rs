use std::sync::Arc;

use crate::store::{Store, StoreExt, StoreResult, WriteTx};

/// Conditional-GET validators last seen for a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheHeaders {
    pub last_modified: Option<String>,
    pub etag: Option<String>,
}

impl CacheHeaders {
    pub fn is_empty(&self) -> bool {
        self.last_modified.is_none() && self.etag.is_none()
    }
}

/// Per (river, feed URL) cache headers, kept in the river's bucket.
#[derive(Clone)]
pub struct CacheHeaderStore {
    store: Arc<dyn Store>,
}

impl CacheHeaderStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn load(&self, river: &str, url: &str) -> StoreResult<CacheHeaders> {
        let (lm_key, etag_key) = keys(url);

        self.store.read(|tx| {
            Ok(CacheHeaders {
                last_modified: decode(tx.get(river, &lm_key)?),
                etag: decode(tx.get(river, &etag_key)?),
            })
        })
    }

    /// Overwrites both validators. A header missing from the latest
    /// response clears the stored one.
    pub fn save(&self, river: &str, url: &str, headers: &CacheHeaders) -> StoreResult<()> {
        let (lm_key, etag_key) = keys(url);
        let last_modified = headers.last_modified.as_deref().unwrap_or_default();
        let etag = headers.etag.as_deref().unwrap_or_default();

        self.store.batch(&mut |tx: &mut dyn WriteTx| {
            tx.put(river, &lm_key, last_modified.as_bytes())?;
            tx.put(river, &etag_key, etag.as_bytes())
        })
    }
}

fn keys(url: &str) -> (String, String) {
    (format!("lastModified:{}", url), format!("etag:{}", url))
}

fn decode(raw: Option<Vec<u8>>) -> Option<String> {
    raw.and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|value| !value.is_empty())
}
