// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store handle: connection management, pragmas, migration, retry.

use crate::error::StoreError;
use crate::schema;
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Max attempts for transient lock conflicts before giving up.
const BUSY_RETRIES: u32 = 5;

/// SQLite busy handler timeout per statement.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the shared embedded store.
///
/// Cheap to clone; all clones share one connection behind a mutex.
/// Every multi-statement operation runs inside an immediate transaction
/// so concurrent daemon processes serialize at the database level.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the store at the given path and migrate.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Corrupt(format!("create {}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run an operation inside an immediate transaction, retrying
    /// transient lock conflicts with jitter.
    pub(crate) fn with_tx<T>(
        &self,
        f: impl Fn(&Transaction) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        for attempt in 0..BUSY_RETRIES {
            let mut conn = self.conn.lock();
            let result = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(StoreError::from)
                .and_then(|tx| {
                    let value = f(&tx)?;
                    tx.commit()?;
                    Ok(value)
                });
            drop(conn);

            match result {
                Err(e) if e.is_transient() && attempt + 1 < BUSY_RETRIES => {
                    let backoff = jittered_backoff(attempt);
                    warn!(attempt, backoff_ms = backoff.as_millis() as u64, "store busy, retrying");
                    std::thread::sleep(backoff);
                }
                other => return other,
            }
        }
        Err(StoreError::Busy)
    }

    /// Run a read-only operation on the shared connection.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

/// Exponential backoff with random jitter for busy retries.
fn jittered_backoff(attempt: u32) -> Duration {
    use rand::Rng;
    let base = 10u64 << attempt;
    let jitter = rand::rng().random_range(0..base);
    Duration::from_millis(base + jitter)
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version >= schema::SCHEMA_VERSION {
        return Ok(());
    }

    debug!(from = version, to = schema::SCHEMA_VERSION, "migrating store schema");
    if version < 1 {
        conn.execute_batch(schema::SCHEMA_V1)?;
    }
    conn.pragma_update(None, "user_version", schema::SCHEMA_VERSION)?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
