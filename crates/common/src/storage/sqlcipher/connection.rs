//! Pooled SQLCipher connection wrapper

use std::ops::{Deref, DerefMut};

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection as RusqliteConnection, Row, ToSql, TransactionBehavior};
use tracing::instrument;

use crate::storage::error::{StorageError, StorageResult};

/// Wraps a pooled rusqlite connection; returned to the pool on drop.
pub struct SqlCipherConnection {
    inner: PooledConnection<SqliteConnectionManager>,
}

impl SqlCipherConnection {
    /// Create a new connection wrapper from a pooled connection
    pub fn new(conn: PooledConnection<SqliteConnectionManager>) -> Self {
        Self { inner: conn }
    }

    /// Execute a statement that does not return rows
    #[instrument(level = "trace", skip(self, params), fields(sql = %sql))]
    pub fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> StorageResult<usize> {
        self.inner.execute(sql, params).map_err(StorageError::from)
    }

    /// Execute a SQL query that returns a single row
    #[instrument(level = "trace", skip(self, params, f), fields(sql = %sql))]
    pub fn query_row<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> StorageResult<T>
    where
        F: FnOnce(&Row<'_>) -> Result<T, rusqlite::Error>,
    {
        self.inner.query_row(sql, params, f).map_err(StorageError::from)
    }

    /// Like [`Self::query_row`] but maps "no rows" to `None`
    pub fn query_optional<T, F>(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
        f: F,
    ) -> StorageResult<Option<T>>
    where
        F: FnOnce(&Row<'_>) -> Result<T, rusqlite::Error>,
    {
        match self.query_row(sql, params, f) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_no_rows() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Run a query and collect every mapped row
    #[instrument(level = "trace", skip(self, params, f), fields(sql = %sql))]
    pub fn query_map<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> StorageResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
    {
        let mut stmt = self.inner.prepare(sql)?;
        let rows = stmt.query_map(params, f)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    /// Begin an IMMEDIATE transaction (takes the write lock up front)
    #[instrument(level = "trace", skip(self))]
    pub fn immediate_transaction(&mut self) -> StorageResult<rusqlite::Transaction<'_>> {
        self.inner
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)
    }
}

impl Deref for SqlCipherConnection {
    type Target = RusqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for SqlCipherConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
