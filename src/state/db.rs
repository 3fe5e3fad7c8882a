// SQLite database setup and migrations
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

use super::storage::{ensure_parent_dir, StorageError};
use crate::chem::FormulaError;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),
    /// A uniqueness (or primary key) constraint rejected a write
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    #[error(transparent)]
    Formula(#[from] FormulaError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Gave up creating {entity} after {attempts} conflicting attempts")]
    RetriesExhausted { entity: &'static str, attempts: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl DbError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        DbError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, ref message)
                if failure.code == ErrorCode::ConstraintViolation
                    && matches!(
                        failure.extended_code,
                        rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                            | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    ) =>
            {
                DbError::ConstraintViolation(
                    message.clone().unwrap_or_else(|| failure.to_string()),
                )
            }
            other => DbError::Sqlite(other),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// Thread-safe database connection wrapper
pub struct DbConnection {
    conn: Arc<Mutex<Connection>>,
}

impl DbConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Open (and migrate) a database file
    pub fn open(path: &Path, busy_timeout: Duration) -> DbResult<Self> {
        ensure_parent_dir(path)?;
        let mut conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        configure(&mut conn)?;
        log::debug!("Opened database {}", path.display());
        Ok(Self::new(conn))
    }

    /// Open a private in-memory database, mostly for tests
    pub fn open_in_memory() -> DbResult<Self> {
        let mut conn = Connection::open_in_memory()?;
        configure(&mut conn)?;
        Ok(Self::new(conn))
    }

    /// Lock the connection. A poisoned lock is recovered: SQLite keeps its own
    /// transactional state, so the connection is still usable.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` as one unit of work inside an IMMEDIATE transaction.
    ///
    /// The write lock is taken up front so concurrent writers wait on the busy
    /// timeout instead of failing mid-transaction. Any error rolls the work back.
    pub fn with_transaction<T, E>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DbError::from)?;
        let value = f(&tx)?;
        tx.commit().map_err(DbError::from)?;
        Ok(value)
    }
}

impl Clone for DbConnection {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

fn configure(conn: &mut Connection) -> DbResult<()> {
    // Enable foreign keys
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    run_migrations(conn)?;
    Ok(())
}

/// Run `f` inside a named savepoint on an already-open transaction.
///
/// On error only the work done by `f` is rolled back; the enclosing transaction
/// stays usable.
pub fn in_savepoint<T, E>(
    conn: &Connection,
    name: &str,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<DbError>,
{
    conn.execute_batch(&format!("SAVEPOINT {}", name))
        .map_err(DbError::from)?;

    match f() {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {}", name))
                .map_err(DbError::from)?;
            Ok(value)
        }
        Err(err) => {
            conn.execute_batch(&format!("ROLLBACK TO {}; RELEASE {}", name, name))
                .map_err(DbError::from)?;
            Err(err)
        }
    }
}

/// Bring the schema up to date.
///
/// The version check and the migrations share one IMMEDIATE transaction, so
/// connections opening a fresh file together apply each migration exactly once.
fn run_migrations(conn: &mut Connection) -> DbResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Create migrations table if it doesn't exist
    tx.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = tx.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version < 1 {
        migration_v1(&tx)?;
        tx.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [1])?;
        log::info!("Applied schema migration v1");
    }

    tx.commit()?;
    Ok(())
}

fn migration_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS compound (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            standardized_name TEXT NOT NULL UNIQUE,
            molecular_formula TEXT NOT NULL,
            notes TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_compound_molecular_formula
            ON compound(molecular_formula);

        CREATE TABLE IF NOT EXISTS external_database (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            url TEXT,
            compound_url TEXT
        );

        CREATE TABLE IF NOT EXISTS dbxref (
            compound_id INTEGER NOT NULL,
            external_database_id INTEGER NOT NULL,
            external_compound_id TEXT NOT NULL,
            PRIMARY KEY (compound_id, external_database_id),
            FOREIGN KEY (compound_id) REFERENCES compound(id) ON DELETE CASCADE,
            FOREIGN KEY (external_database_id) REFERENCES external_database(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS chromatography_method (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT
        );

        CREATE TABLE IF NOT EXISTS standard_run (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            operator TEXT NOT NULL,
            raw_data_file TEXT,
            chromatography_method_id INTEGER NOT NULL,
            UNIQUE (date, operator),
            FOREIGN KEY (chromatography_method_id) REFERENCES chromatography_method(id)
        );
        CREATE INDEX IF NOT EXISTS idx_standard_run_method
            ON standard_run(chromatography_method_id);

        CREATE TABLE IF NOT EXISTS retention_time (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            compound_id INTEGER NOT NULL,
            standard_run_id INTEGER NOT NULL,
            retention_time REAL,
            UNIQUE (compound_id, standard_run_id),
            FOREIGN KEY (compound_id) REFERENCES compound(id) ON DELETE CASCADE,
            FOREIGN KEY (standard_run_id) REFERENCES standard_run(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_retention_time_run
            ON retention_time(standard_run_id);

        CREATE TABLE IF NOT EXISTS compound_list (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT
        );

        CREATE TABLE IF NOT EXISTS compound_list_compound (
            compound_list_id INTEGER NOT NULL,
            compound_id INTEGER NOT NULL,
            PRIMARY KEY (compound_list_id, compound_id),
            FOREIGN KEY (compound_list_id) REFERENCES compound_list(id) ON DELETE CASCADE,
            FOREIGN KEY (compound_id) REFERENCES compound(id) ON DELETE CASCADE
        );",
    )?;

    Ok(())
}
