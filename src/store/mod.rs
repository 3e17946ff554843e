pub mod cache_headers;
pub mod ledger;
pub mod sqlite;
pub mod update_log;

pub use cache_headers::{CacheHeaderStore, CacheHeaders};
pub use ledger::{Fingerprint, FingerprintLedger};
pub use sqlite::SqliteStore;
pub use update_log::UpdateLog;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Corrupt value at {bucket}/{key}: {reason}")]
    Corrupt {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("Store lock poisoned: {0}")]
    Poisoned(String),

    #[error("Transaction body did not run")]
    NotRun,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read access inside a transaction.
pub trait ReadTx {
    fn get(&self, bucket: &str, key: &str) -> StoreResult<Option<Vec<u8>>>;
}

/// Read-write access inside a transaction.
pub trait WriteTx: ReadTx {
    fn put(&mut self, bucket: &str, key: &str, value: &[u8]) -> StoreResult<()>;
}

/// An embedded key-value store organised into named buckets.
///
/// Every `update` is one atomic read-modify-write transaction: if the body
/// returns an error nothing it wrote is kept. Implementations must accept
/// transactions from many tasks at once.
pub trait Store: Send + Sync {
    fn create_bucket_if_absent(&self, name: &str) -> StoreResult<()>;

    fn view(&self, f: &mut dyn FnMut(&dyn ReadTx) -> StoreResult<()>) -> StoreResult<()>;

    fn update(&self, f: &mut dyn FnMut(&mut dyn WriteTx) -> StoreResult<()>) -> StoreResult<()>;

    /// Write transaction that may be coalesced with others. SQLite has no
    /// group commit to exploit, so the default is a plain `update`.
    fn batch(&self, f: &mut dyn FnMut(&mut dyn WriteTx) -> StoreResult<()>) -> StoreResult<()> {
        self.update(f)
    }
}

/// Value-returning wrappers around [`Store::view`] and [`Store::update`].
pub trait StoreExt: Store {
    fn read<T>(&self, mut f: impl FnMut(&dyn ReadTx) -> StoreResult<T>) -> StoreResult<T> {
        let mut out = None;
        self.view(&mut |tx: &dyn ReadTx| {
            out = Some(f(tx)?);
            Ok(())
        })?;
        out.ok_or(StoreError::NotRun)
    }

    fn write<T>(&self, mut f: impl FnMut(&mut dyn WriteTx) -> StoreResult<T>) -> StoreResult<T> {
        let mut out = None;
        self.update(&mut |tx: &mut dyn WriteTx| {
            out = Some(f(tx)?);
            Ok(())
        })?;
        out.ok_or(StoreError::NotRun)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}
