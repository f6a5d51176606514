//! Connection acquisition and transaction lifecycle

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};

use super::schema;
use crate::{Error, Result};

/// Default busy timeout for contended writes
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

static MEMORY_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Hands out database connections to the stores.
///
/// A write acquisition returns a connection with an open transaction; the
/// store (or the caller, for participant operations) ends it with
/// [`commit`](Self::commit) or [`rollback`](Self::rollback). A read-only
/// acquisition returns a connection with no open transaction.
pub trait ConnectionProvider: Send + Sync {
    /// Acquire a connection
    fn acquire(&self, read_only: bool) -> Result<Connection>;

    /// Commit the open transaction
    fn commit(&self, conn: &Connection) -> Result<()> {
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")
                .map_err(|e| Error::persistence("Error while committing transaction", e))?;
        }
        Ok(())
    }

    /// Roll back the open transaction, if any
    fn rollback(&self, conn: &Connection) {
        if conn.is_autocommit() {
            return;
        }
        if let Err(e) = conn.execute_batch("ROLLBACK") {
            tracing::warn!("Failed to roll back transaction: {}", e);
        }
    }

    /// Release the connection
    fn close(&self, conn: Connection) {
        if let Err((_, e)) = conn.close() {
            tracing::warn!("Failed to close connection: {}", e);
        }
    }
}

/// Options applied to every connection a [`SqliteProvider`] opens
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// SQLite-backed connection provider
pub struct SqliteProvider {
    target: String,
    flags: OpenFlags,
    options: StoreOptions,
    // A named memdb database lives only while a connection is open
    _keepalive: Option<Mutex<Connection>>,
}

impl SqliteProvider {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, StoreOptions::default())
    }

    pub fn open_with(path: &Path, options: StoreOptions) -> Result<Self> {
        let provider = Self {
            target: path_to_string(path),
            flags: OpenFlags::default(),
            options,
            _keepalive: None,
        };
        let conn = provider.connect()?;
        provider.initialize_schema(&conn)?;
        provider.close(conn);
        Ok(provider)
    }

    /// Open a private in-memory database shared by all connections of this
    /// provider (for testing).
    ///
    /// Uses the `memdb` VFS rather than shared cache: memdb takes ordinary
    /// database locks, so contending writers wait on the busy timeout instead
    /// of failing with `SQLITE_LOCKED_SHAREDCACHE`.
    pub fn in_memory() -> Result<Self> {
        let n = MEMORY_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
        let target = format!(
            "file:/claimstore-mem-{}-{}?vfs=memdb",
            std::process::id(),
            n
        );
        let mut provider = Self {
            target,
            flags: OpenFlags::default() | OpenFlags::SQLITE_OPEN_URI,
            options: StoreOptions::default(),
            _keepalive: None,
        };
        let conn = provider.connect()?;
        provider.initialize_schema(&conn)?;
        provider._keepalive = Some(Mutex::new(conn));
        Ok(provider)
    }

    /// Database location this provider connects to
    pub fn target(&self) -> PathBuf {
        PathBuf::from(&self.target)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(&self.target, self.flags)
            .map_err(|e| Error::persistence("Error while acquiring database connection", e))?;
        conn.busy_timeout(self.options.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    /// Initialize the database schema
    fn initialize_schema(&self, conn: &Connection) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])
                .map_err(|e| Error::persistence("Error while initializing schema", e))?;
        }
        Ok(())
    }
}

impl ConnectionProvider for SqliteProvider {
    fn acquire(&self, read_only: bool) -> Result<Connection> {
        let conn = self.connect()?;
        if read_only {
            conn.pragma_update(None, "query_only", true)?;
        } else {
            conn.execute_batch("BEGIN IMMEDIATE")
                .map_err(|e| Error::persistence("Error while starting transaction", e))?;
        }
        Ok(conn)
    }
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// A connection owned by a self-transacting operation.
///
/// Dropping the guard rolls back a transaction that was neither committed
/// nor rolled back, then closes the connection through its provider.
pub struct ManagedConnection<'p> {
    provider: &'p dyn ConnectionProvider,
    conn: Option<Connection>,
}

impl<'p> ManagedConnection<'p> {
    pub fn acquire(provider: &'p dyn ConnectionProvider, read_only: bool) -> Result<Self> {
        let conn = provider.acquire(read_only)?;
        Ok(Self {
            provider,
            conn: Some(conn),
        })
    }

    pub fn commit(&self) -> Result<()> {
        self.provider.commit(self)
    }

    pub fn rollback(&self) {
        self.provider.rollback(self)
    }
}

impl std::ops::Deref for ManagedConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only taken in drop
        self.conn.as_ref().expect("connection already released")
    }
}

impl Drop for ManagedConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.provider.rollback(&conn);
            self.provider.close(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_acquire_opens_transaction() {
        let provider = SqliteProvider::in_memory().unwrap();

        let conn = provider.acquire(false).unwrap();
        assert!(!conn.is_autocommit());
        provider.rollback(&conn);
        assert!(conn.is_autocommit());
        provider.close(conn);
    }

    #[test]
    fn test_read_only_acquire_rejects_writes() {
        let provider = SqliteProvider::in_memory().unwrap();

        let conn = provider.acquire(true).unwrap();
        assert!(conn.is_autocommit());
        let result = conn.execute(
            "INSERT INTO claim_dialects (dialect_uri, tenant_id) VALUES ('urn:x', 1)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_dropped_guard_rolls_back() {
        let provider = SqliteProvider::in_memory().unwrap();

        {
            let conn = ManagedConnection::acquire(&provider, false).unwrap();
            conn.execute(
                "INSERT INTO claim_dialects (dialect_uri, tenant_id) VALUES ('urn:x', 1)",
                [],
            )
            .unwrap();
        }

        let conn = ManagedConnection::acquire(&provider, true).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM claim_dialects", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_committed_guard_persists() {
        let provider = SqliteProvider::in_memory().unwrap();

        {
            let conn = ManagedConnection::acquire(&provider, false).unwrap();
            conn.execute(
                "INSERT INTO claim_dialects (dialect_uri, tenant_id) VALUES ('urn:x', 1)",
                [],
            )
            .unwrap();
            conn.commit().unwrap();
        }

        let conn = ManagedConnection::acquire(&provider, true).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM claim_dialects", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_file_provider_bootstraps_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claims.db");

        let provider = SqliteProvider::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(provider.target(), path);

        let conn = provider.acquire(true).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name LIKE 'claim%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }
}
