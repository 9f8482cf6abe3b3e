use std::fs;
use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};
use tracing::{debug, error, info};

use crate::config::DatabaseConfig;
use crate::error::{FinanceError, Result};
use crate::logging::OperationTimer;
use crate::schema::{contacts, loans, transactions};

// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const DEFAULT_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Database manager for handling connections and units of work
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("state", &self.pool.state()).finish()
    }
}

impl Database {
    /// Open (and migrate) the database at `database_url`.
    ///
    /// Accepts a plain path, a `sqlite:` / `sqlite://` URL, or `:memory:`.
    pub fn new(database_url: &str) -> Result<Self> {
        Self::open(database_url, DEFAULT_MAX_CONNECTIONS, DEFAULT_CONNECTION_TIMEOUT)
    }

    /// Open the database described by the `[database]` configuration section
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::open(
            &config.path,
            config.max_connections,
            Duration::from_secs(config.connection_timeout_secs),
        )
    }

    /// Open a private in-memory database, mostly useful for tests.
    pub fn in_memory() -> Result<Self> {
        // Every in-memory connection is its own database, so the pool holds
        // exactly one connection and never recycles it.
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(DEFAULT_CONNECTION_TIMEOUT)
            .build(Self::manager(SqliteConnectionManager::memory()))?;
        Self::migrated(pool)
    }

    /// Open a file database with an explicit pool size and checkout timeout
    pub fn open(database_url: &str, max_connections: u32, timeout: Duration) -> Result<Self> {
        let path = database_path(database_url);
        if path == ":memory:" {
            return Self::in_memory();
        }

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let pool = Pool::builder()
            .max_size(max_connections)
            .connection_timeout(timeout)
            .build(Self::manager(SqliteConnectionManager::file(path)))?;

        info!(path, max_connections, "Opened ledger database");
        Self::migrated(pool)
    }

    fn manager(manager: SqliteConnectionManager) -> SqliteConnectionManager {
        manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"))
    }

    fn migrated(pool: DbPool) -> Result<Self> {
        let conn = pool.get()?;
        Self::run_migrations(&conn)?;
        drop(conn);
        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!("../migrations/2025-01-10-000000_create_tables/up.sql"))?;
        conn.execute_batch(include_str!("../migrations/2025-01-24-000000_add_ledger_indexes/up.sql"))?;
        debug!("Migrations applied");
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Run `work` inside one BEGIN/COMMIT unit.
    ///
    /// If `work` returns an error the whole unit is rolled back and the error
    /// is passed through unchanged, so a rejected business rule never leaves
    /// half-written rows behind.
    pub fn unit_of_work<T, F>(&self, operation: &str, work: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let timer = OperationTimer::new(operation);
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        match work(&tx) {
            Ok(value) => {
                tx.commit()?;
                timer.finish();
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    error!(operation, error = %rollback_err, "Rollback failed");
                }
                if matches!(
                    err,
                    FinanceError::Database(_)
                        | FinanceError::Pool(_)
                        | FinanceError::Io(_)
                        | FinanceError::MirroredEntryMissing(_)
                ) {
                    error!(operation, error = %err, "Unit of work failed, rolled back");
                } else {
                    debug!(operation, error = %err, "Unit of work rolled back");
                }
                Err(err)
            }
        }
    }

    /// Row counts of the three ledger tables
    pub fn table_counts(&self) -> Result<TableCounts> {
        let conn = self.get_connection()?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), params![], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or_default())
        };

        Ok(TableCounts {
            contacts: count(contacts::TABLE)?,
            transactions: count(transactions::TABLE)?,
            loans: count(loans::TABLE)?,
        })
    }
}

/// Number of rows per table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCounts {
    pub contacts: usize,
    pub transactions: usize,
    pub loans: usize,
}

/// Strip an optional `sqlite:` / `sqlite://` scheme from a database URL
fn database_path(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

/// Initialize the database connection from configuration
pub fn establish_connection(config: &DatabaseConfig) -> Result<Database> {
    let database = Database::from_config(config)?;
    info!(path = %config.path, "Database ready");
    Ok(database)
}
