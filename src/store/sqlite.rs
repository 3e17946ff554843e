use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::store::{ReadTx, Store, StoreError, StoreResult, WriteTx};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> StoreResult<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

/// Transaction handle; `conn` is always inside an open transaction.
struct SqliteTx<'a> {
    conn: &'a Connection,
}

impl SqliteTx<'_> {
    fn ensure_bucket(&self, bucket: &str) -> StoreResult<()> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM buckets WHERE name = ?1",
                params![bucket],
                |_| Ok(()),
            )
            .optional()?;

        match exists {
            Some(()) => Ok(()),
            None => Err(StoreError::BucketNotFound(bucket.to_string())),
        }
    }
}

impl ReadTx for SqliteTx<'_> {
    fn get(&self, bucket: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.ensure_bucket(bucket)?;

        let value = self
            .conn
            .query_row(
                "SELECT value FROM entries WHERE bucket = ?1 AND key = ?2",
                params![bucket, key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;

        Ok(value)
    }
}

impl WriteTx for SqliteTx<'_> {
    fn put(&mut self, bucket: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        self.ensure_bucket(bucket)?;

        self.conn.execute(
            "INSERT INTO entries (bucket, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(bucket, key) DO UPDATE SET value = excluded.value",
            params![bucket, key, value],
        )?;

        Ok(())
    }
}

impl Store for SqliteStore {
    fn create_bucket_if_absent(&self, name: &str) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
            params![name, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    fn view(&self, f: &mut dyn FnMut(&dyn ReadTx) -> StoreResult<()>) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let result = f(&SqliteTx { conn: &tx });
        tx.rollback()?;
        result
    }

    fn update(&self, f: &mut dyn FnMut(&mut dyn WriteTx) -> StoreResult<()>) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        // Dropping `tx` on the error path rolls back.
        f(&mut SqliteTx { conn: &tx })?;
        tx.commit()?;

        Ok(())
    }
}
