use std::ops::Deref;

use rusqlite::{Connection, ToSql};

use crate::db::types::{Allocated, Changes, Filter, Keyed, Record};
use crate::error::{Error, Result};

/// A connection borrowed for the lifetime of one `Db::read` or `Db::write`
/// call. Every method issues exactly one statement.
///
/// Outside `Db::write` the connection is in autocommit mode, so writes made
/// through a shared scope are not serialized against other writers. Use them
/// only for blind inserts and updates that do not depend on a prior read.
pub struct Scope<'a> {
    conn: &'a Connection,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub(crate) fn connection(&self) -> &Connection {
        self.conn
    }

    pub fn create_table<R: Record>(&self) -> Result<()> {
        self.execute(&R::create_table_sql(), &[])?;
        Ok(())
    }

    pub fn drop_table<R: Record>(&self) -> Result<()> {
        self.execute(&format!("DROP TABLE IF EXISTS {}", R::TABLE), &[])?;
        Ok(())
    }

    /// Writes every field of the record as one row.
    pub fn insert<R: Record>(&self, record: &R) -> Result<()> {
        record.check_fields()?;
        let placeholders = R::COLUMNS
            .iter()
            .map(|c| format!(":{}", c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            R::TABLE,
            R::column_list(),
            placeholders
        );

        let params = serde_rusqlite::to_params_named(record)?;
        log::debug!("SQL EXECUTE: {}", sql);
        let mut stmt = self.conn.prepare(&sql).map_err(|e| Error::sqlite(&sql, e))?;
        stmt.execute(params.to_slice().as_slice())
            .map_err(|e| Error::sqlite(&sql, e))?;
        Ok(())
    }

    pub fn get<R: Record>(&self, filter: &Filter) -> Result<Option<R>> {
        let mut values = Vec::new();
        let where_clause = filter.where_clause::<R>(&mut values)?;
        let sql = format!(
            "SELECT {} FROM {}{} LIMIT 1",
            R::column_list(),
            R::TABLE,
            where_clause
        );
        Ok(self.query::<R>(&sql, &values)?.into_iter().next())
    }

    /// Like `get`, but a missing row is an `Error::NotFound`.
    pub fn get_or_404<R: Record>(&self, filter: &Filter) -> Result<R> {
        self.get(filter)?.ok_or(Error::NotFound { table: R::TABLE })
    }

    pub fn get_by_key<R: Keyed>(&self, key: &R::Key) -> Result<Option<R>> {
        self.get(&R::key_filter(key))
    }

    pub fn get_by_key_or_404<R: Keyed>(&self, key: &R::Key) -> Result<R> {
        self.get_or_404(&R::key_filter(key))
    }

    pub fn list<R: Record>(&self) -> Result<Vec<R>> {
        self.list_where(&Filter::new())
    }

    /// All matching rows, in no particular order.
    pub fn list_where<R: Record>(&self, filter: &Filter) -> Result<Vec<R>> {
        let mut values = Vec::new();
        let where_clause = filter.where_clause::<R>(&mut values)?;
        let sql = format!(
            "SELECT {} FROM {}{}",
            R::column_list(),
            R::TABLE,
            where_clause
        );
        self.query::<R>(&sql, &values)
    }

    pub fn count_where<R: Record>(&self, filter: &Filter) -> Result<i64> {
        let mut values = Vec::new();
        let where_clause = filter.where_clause::<R>(&mut values)?;
        let sql = format!("SELECT COUNT(*) FROM {}{}", R::TABLE, where_clause);
        log::debug!("SQL QUERY: {}", sql);
        self.conn
            .query_row(&sql, &values[..], |row| row.get(0))
            .map_err(|e| Error::sqlite(&sql, e))
    }

    /// Sets the given columns on every matching row and returns how many
    /// rows changed. Columns not named are left untouched.
    pub fn update_where<R: Record>(&self, filter: &Filter, changes: &Changes) -> Result<usize> {
        let mut values = Vec::new();
        let set_clause = changes.set_clause::<R>(&mut values)?;
        let where_clause = filter.where_clause::<R>(&mut values)?;
        let sql = format!("UPDATE {} SET {}{}", R::TABLE, set_clause, where_clause);
        self.execute(&sql, &values)
    }

    pub fn update_by_key<R: Keyed>(&self, key: &R::Key, changes: &Changes) -> Result<usize> {
        self.update_where::<R>(&R::key_filter(key), changes)
    }

    pub fn delete_where<R: Record>(&self, filter: &Filter) -> Result<usize> {
        let mut values = Vec::new();
        let where_clause = filter.where_clause::<R>(&mut values)?;
        let sql = format!("DELETE FROM {}{}", R::TABLE, where_clause);
        self.execute(&sql, &values)
    }

    pub fn delete_by_key<R: Keyed>(&self, key: &R::Key) -> Result<usize> {
        self.delete_where::<R>(&R::key_filter(key))
    }

    fn query<R: Record>(&self, sql: &str, values: &[&dyn ToSql]) -> Result<Vec<R>> {
        log::debug!("SQL QUERY: {}", sql);
        let mut stmt = self.conn.prepare(sql).map_err(|e| Error::sqlite(sql, e))?;
        let rows = stmt.query(values).map_err(|e| Error::sqlite(sql, e))?;
        serde_rusqlite::from_rows::<R>(rows)
            .map(|row| row.map_err(|e| Error::row(sql, e)))
            .collect()
    }

    fn execute(&self, sql: &str, values: &[&dyn ToSql]) -> Result<usize> {
        log::debug!("SQL EXECUTE: {}", sql);
        let affected = self
            .conn
            .execute(sql, values)
            .map_err(|e| Error::sqlite(sql, e))?;
        log::debug!("SQL EXECUTE RESULT: {} rows affected", affected);
        Ok(affected)
    }
}

/// A scope holding the database's single writer lock (`BEGIN IMMEDIATE`).
///
/// Only obtainable through `Db::write`, so identity allocation and every
/// read-decide-write sequence built on it runs under the lock.
pub struct Exclusive<'a> {
    scope: Scope<'a>,
}

impl<'a> Exclusive<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self {
            scope: Scope::new(conn),
        }
    }

    /// `max(id) + 1`, or 1 for an empty table, as seen by this transaction.
    pub fn next_id<R: Allocated>(&self) -> Result<i64> {
        let sql = format!(
            "SELECT COALESCE(MAX({}), 0) + 1 FROM {}",
            R::ID_COLUMN,
            R::TABLE
        );
        log::debug!("SQL QUERY: {}", sql);
        self.scope
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| Error::sqlite(&sql, e))
    }

    /// Defers foreign key checks to commit, so a parent row can be deleted
    /// and reinserted within this transaction.
    pub fn defer_foreign_keys(&self) -> Result<()> {
        let sql = "PRAGMA defer_foreign_keys = ON";
        log::debug!("SQL EXECUTE: {}", sql);
        self.scope
            .conn
            .execute_batch(sql)
            .map_err(|e| Error::sqlite(sql, e))
    }
}

impl<'a> Deref for Exclusive<'a> {
    type Target = Scope<'a>;

    fn deref(&self) -> &Self::Target {
        &self.scope
    }
}
