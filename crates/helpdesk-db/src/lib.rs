pub mod migrations;
pub mod models;
pub mod queries;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::info;

/// Busy timeout applied when none is configured.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

pub struct Database {
    conn: Mutex<Connection>,
    lock_wait: Duration,
}

impl Database {
    pub fn open(path: &Path, lock_wait: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent readers alongside the single writer
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let db = Self::init(conn, lock_wait)?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, DEFAULT_LOCK_WAIT)
    }

    fn init(mut conn: Connection, lock_wait: Duration) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(lock_wait)?;

        migrations::run(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            lock_wait,
        })
    }

    pub fn lock_wait(&self) -> Duration {
        self.lock_wait
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("DB lock poisoned: {}", e))
    }

    /// Run `f` on the connection in autocommit mode.
    pub fn with_conn<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Connection) -> std::result::Result<T, E>,
        E: From<anyhow::Error>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside one `BEGIN IMMEDIATE` transaction. Commits when `f`
    /// returns `Ok`; any error rolls back every statement `f` issued.
    pub fn with_tx<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> std::result::Result<T, E>,
        E: From<anyhow::Error>,
    {
        let mut conn = self.lock()?;
        run_tx(&mut conn, f)
    }

    /// Like [`Database::with_tx`], with the busy timeout widened to
    /// `lock_wait` for the duration. The default is restored afterwards
    /// whether or not the transaction committed.
    pub fn with_tx_lock_wait<F, T, E>(&self, lock_wait: Duration, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> std::result::Result<T, E>,
        E: From<anyhow::Error>,
    {
        let mut conn = self.lock()?;
        conn.busy_timeout(lock_wait).map_err(anyhow::Error::from)?;

        let outcome = run_tx(&mut conn, f);
        let reset = conn.busy_timeout(self.lock_wait).map_err(anyhow::Error::from);

        let value = outcome?;
        reset?;
        Ok(value)
    }
}

fn run_tx<F, T, E>(conn: &mut Connection, f: F) -> std::result::Result<T, E>
where
    F: FnOnce(&Transaction<'_>) -> std::result::Result<T, E>,
    E: From<anyhow::Error>,
{
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(anyhow::Error::from)?;
    // Dropping an uncommitted transaction rolls it back.
    let value = f(&tx)?;
    tx.commit().map_err(anyhow::Error::from)?;
    Ok(value)
}

/// Current time as stored in timestamp columns (Unix milliseconds).
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
