use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, TransactionBehavior};
use rusqlite_migration::Migrations;

use crate::attendance::AttendanceChange;
use crate::config::Config;
use crate::db::transaction::{Exclusive, Scope};
use crate::error::{Error, Result};
use crate::models::{Activity, Attendee, Event, KitItem, User};
use crate::feed::ChangeFeed;

/// Handle on one SQLite database file. Cheap to clone; clones share the
/// connection pool.
#[derive(Clone)]
pub struct Db {
    pool: Pool<SqliteConnectionManager>,
    changes: ChangeFeed,
}

impl Db {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_config(&Config {
            db_path: path.as_ref().to_path_buf(),
            ..Config::default()
        })
    }

    pub fn with_config(config: &Config) -> Result<Self> {
        let busy_timeout = config.busy_timeout;
        let manager = SqliteConnectionManager::file(&config.db_path)
            .with_init(move |conn| init_connection(conn, busy_timeout));
        let pool = Pool::builder().max_size(config.pool_size).build(manager)?;
        log::info!(
            "Opened {} with up to {} connections",
            config.db_path.display(),
            config.pool_size
        );
        Ok(Self::from_pool(pool))
    }

    /// An in-memory database. The pool holds exactly one connection that is
    /// never recycled, so every scope sees the same data.
    pub fn open_memory() -> Result<Self> {
        let busy_timeout = Config::default().busy_timeout;
        let manager = SqliteConnectionManager::memory()
            .with_init(move |conn| init_connection(conn, busy_timeout));
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        Ok(Self::from_pool(pool))
    }

    fn from_pool(pool: Pool<SqliteConnectionManager>) -> Self {
        Self {
            pool,
            changes: ChangeFeed::new(),
        }
    }

    /// Calls the closure with a shared connection in autocommit mode. Any
    /// number of readers may run at once.
    pub fn read<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Scope) -> Result<R>,
    {
        let conn = self.pool.get()?;
        f(&Scope::new(&conn))
    }

    /// Calls the closure inside a `BEGIN IMMEDIATE` transaction. Commits
    /// if the closure returns Ok, otherwise rolls back every write it made.
    /// Only one write scope is open at a time across all connections to the
    /// database file.
    pub fn write<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Exclusive) -> Result<R>,
    {
        let mut conn = self.pool.get()?;
        log::debug!("SQL EXECUTE: BEGIN IMMEDIATE");
        let txn = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::sqlite("BEGIN IMMEDIATE", e))?;

        match f(&Exclusive::new(&txn)) {
            Ok(result) => {
                log::debug!("SQL EXECUTE: COMMIT");
                txn.commit().map_err(|e| Error::sqlite("COMMIT", e))?;
                Ok(result)
            }
            Err(e) => {
                log::debug!("SQL EXECUTE: ROLLBACK ({})", e);
                txn.rollback().map_err(|e| Error::sqlite("ROLLBACK", e))?;
                Err(e)
            }
        }
    }

    /// Creates every table that is missing, parents before children.
    pub fn create_tables(&self) -> Result<()> {
        self.read(|s| {
            s.create_table::<User>()?;
            s.create_table::<Event>()?;
            s.create_table::<Attendee>()?;
            s.create_table::<Activity>()?;
            s.create_table::<KitItem>()?;
            Ok(())
        })
    }

    pub fn migrate(&self, migrations: &Migrations) -> Result<()> {
        let mut conn = self.pool.get()?;
        migrations.to_latest(&mut *conn)?;
        Ok(())
    }

    /// Base tables followed by the crate's own migrations.
    pub fn setup(&self) -> Result<()> {
        self.create_tables()?;
        self.migrate(&crate::schema::migrations())
    }

    /// Receives every attendance change after it has been committed.
    pub fn subscribe(&self) -> std::sync::mpsc::Receiver<AttendanceChange> {
        self.changes.subscribe()
    }

    /// Runs `callback` on a background thread for every committed
    /// attendance change.
    pub fn on_change<F>(&self, callback: F) -> Result<()>
    where
        F: FnMut(AttendanceChange) + Send + 'static,
    {
        self.changes.on_change(callback)
    }

    pub(crate) fn publish(&self, change: AttendanceChange) {
        self.changes.publish(change);
    }
}

fn init_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}
