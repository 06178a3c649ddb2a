// crates/bulk-ingest-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Table Store
// Description: Durable TableStore and SchemaRegistry backed by SQLite WAL.
// Purpose: Persist rows and schemas with one transaction per import.
// Dependencies: bulk-ingest-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Rows are stored as JSON objects keyed by `(table_name, row_id)`; row
//! identifiers come from a per-table sequence that never reuses values, so
//! ordering by `row_id` is insertion order even after deletes. A write
//! transaction holds the connection mutex from `BEGIN IMMEDIATE` until it
//! commits or is dropped, and a dropped transaction issues `ROLLBACK`.
//! Database contents are untrusted: decoded rows and schemas fail closed on
//! malformed payloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use bulk_ingest_core::RegistryError;
use bulk_ingest_core::Row;
use bulk_ingest_core::RowId;
use bulk_ingest_core::SchemaRegistry;
use bulk_ingest_core::StoreError;
use bulk_ingest_core::StoredRow;
use bulk_ingest_core::TableName;
use bulk_ingest_core::TableSchema;
use bulk_ingest_core::TableStore;
use bulk_ingest_core::WriteTxn;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum encoded row size accepted by the store.
pub const MAX_ROW_BYTES: usize = 1024 * 1024;
/// Maximum encoded schema size accepted by the registry.
const MAX_SCHEMA_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` table store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a config for `path` with default pragmas.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw row or schema payloads.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Payload exceeded size limits.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => {
                Self::Store(format!("version mismatch: {message}"))
            }
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "row_json exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

impl From<SqliteStoreError> for RegistryError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "schema_json exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
            other => Self::Store(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed table store and schema registry.
///
/// # Invariants
/// - `SQLite` connection access is serialized through a mutex.
/// - At most one write transaction is open at a time.
#[derive(Clone)]
pub struct SqliteTableStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared connection.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteTableStore {
    /// Opens an `SQLite`-backed table store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))
    }

    /// Counts rows for `table`.
    fn count_rows(&self, table: &TableName) -> Result<usize, SqliteStoreError> {
        let guard = self.lock()?;
        let count: i64 = guard
            .query_row(
                "SELECT COUNT(1) FROM table_rows WHERE table_name = ?1",
                params![table.as_str()],
                |row| row.get(0),
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        usize::try_from(count)
            .map_err(|_| SqliteStoreError::Corrupt("negative row count".to_string()))
    }
}

impl TableStore for SqliteTableStore {
    fn scan(&self, table: &TableName) -> Result<Vec<StoredRow>, StoreError> {
        let guard = self.lock()?;
        Ok(load_rows(&guard, table)?)
    }

    fn row_count(&self, table: &TableName) -> Result<usize, StoreError> {
        Ok(self.count_rows(table)?)
    }

    fn begin_write<'a>(
        &'a self,
        table: &TableName,
    ) -> Result<Box<dyn WriteTxn + 'a>, StoreError> {
        let connection = self.lock()?;
        connection
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let mut txn = SqliteWriteTxn {
            connection,
            table: table.clone(),
            rows: Vec::new(),
            next_id: 1,
            finished: false,
        };
        txn.rows = load_rows(&txn.connection, table)?;
        txn.next_id = load_next_id(&txn.connection, table)?;
        Ok(Box::new(txn))
    }

    fn readiness(&self) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .query_row("SELECT 1", params![], |row| row.get::<_, i64>(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }
}

impl SchemaRegistry for SqliteTableStore {
    fn list_tables(&self) -> Result<Vec<TableName>, RegistryError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare("SELECT table_name FROM table_schemas ORDER BY table_name")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let names = statement
            .query_map(params![], |row| row.get::<_, String>(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(names.into_iter().map(TableName::new).collect())
    }

    fn schema(&self, table: &TableName) -> Result<Option<TableSchema>, RegistryError> {
        let guard = self.lock()?;
        let bytes: Option<Vec<u8>> = guard
            .query_row(
                "SELECT schema_json FROM table_schemas WHERE table_name = ?1",
                params![table.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        let schema: TableSchema = serde_json::from_slice(&bytes)
            .map_err(|err| SqliteStoreError::Corrupt(format!("schema for {table}: {err}")))?;
        if &schema.name != table {
            return Err(SqliteStoreError::Corrupt(format!(
                "schema name mismatch for table {table}"
            ))
            .into());
        }
        Ok(Some(schema))
    }

    fn put_schema(&self, schema: TableSchema) -> Result<(), RegistryError> {
        let bytes = serde_json::to_vec(&schema)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if bytes.len() > MAX_SCHEMA_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_SCHEMA_BYTES,
                actual_bytes: bytes.len(),
            }
            .into());
        }
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO table_schemas (table_name, schema_json, registered_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(table_name) DO UPDATE SET
                     schema_json = excluded.schema_json,
                     registered_at = excluded.registered_at",
                params![schema.name.as_str(), bytes, unix_millis()],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Write Transaction
// ============================================================================

/// Open `BEGIN IMMEDIATE` transaction over one table.
struct SqliteWriteTxn<'a> {
    /// Connection guard held for the whole transaction.
    connection: MutexGuard<'a, Connection>,
    /// Table being written.
    table: TableName,
    /// Rows present at transaction start.
    rows: Vec<StoredRow>,
    /// Next identifier to assign.
    next_id: u64,
    /// Set once `COMMIT` succeeds.
    finished: bool,
}

impl WriteTxn for SqliteWriteTxn<'_> {
    fn rows(&self) -> &[StoredRow] {
        &self.rows
    }

    fn insert(&mut self, values: Row) -> Result<RowId, StoreError> {
        let id = RowId::new(self.next_id);
        let bytes = encode_row(&values)?;
        self.connection
            .execute(
                "INSERT INTO table_rows (table_name, row_id, row_json) VALUES (?1, ?2, ?3)",
                params![self.table.as_str(), row_id_to_sql(id)?, bytes],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| {
                SqliteStoreError::Invalid("row identifier space exhausted".to_string())
            })?;
        Ok(id)
    }

    fn replace(&mut self, id: RowId, values: Row) -> Result<(), StoreError> {
        let bytes = encode_row(&values)?;
        let changed = self
            .connection
            .execute(
                "UPDATE table_rows SET row_json = ?3 WHERE table_name = ?1 AND row_id = ?2",
                params![self.table.as_str(), row_id_to_sql(id)?, bytes],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        if changed != 1 {
            return Err(SqliteStoreError::Invalid(format!("row {id} does not exist")).into());
        }
        Ok(())
    }

    fn delete(&mut self, id: RowId) -> Result<(), StoreError> {
        let changed = self
            .connection
            .execute(
                "DELETE FROM table_rows WHERE table_name = ?1 AND row_id = ?2",
                params![self.table.as_str(), row_id_to_sql(id)?],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        if changed != 1 {
            return Err(SqliteStoreError::Invalid(format!("row {id} does not exist")).into());
        }
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut txn = self;
        let next_id = i64::try_from(txn.next_id)
            .map_err(|_| SqliteStoreError::Invalid("row identifier overflow".to_string()))?;
        txn.connection
            .execute(
                "INSERT INTO table_sequences (table_name, next_id) VALUES (?1, ?2)
                 ON CONFLICT(table_name) DO UPDATE SET next_id = excluded.next_id",
                params![txn.table.as_str(), next_id],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        txn.connection
            .execute_batch("COMMIT")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        txn.finished = true;
        Ok(())
    }
}

impl Drop for SqliteWriteTxn<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.connection.execute_batch("ROLLBACK");
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS table_schemas (
                    table_name TEXT PRIMARY KEY,
                    schema_json BLOB NOT NULL,
                    registered_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS table_rows (
                    table_name TEXT NOT NULL,
                    row_id INTEGER NOT NULL,
                    row_json BLOB NOT NULL,
                    PRIMARY KEY (table_name, row_id)
                );
                CREATE TABLE IF NOT EXISTS table_sequences (
                    table_name TEXT PRIMARY KEY,
                    next_id INTEGER NOT NULL
                );",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Loads every row of `table` ordered by identifier.
fn load_rows(
    connection: &Connection,
    table: &TableName,
) -> Result<Vec<StoredRow>, SqliteStoreError> {
    let mut statement = connection
        .prepare("SELECT row_id, row_json FROM table_rows WHERE table_name = ?1 ORDER BY row_id")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let raw = statement
        .query_map(params![table.as_str()], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
        })
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    raw.into_iter()
        .map(|(id, bytes)| {
            let id = u64::try_from(id)
                .map_err(|_| SqliteStoreError::Corrupt(format!("negative row id in {table}")))?;
            let values: Row = serde_json::from_slice(&bytes)
                .map_err(|err| SqliteStoreError::Corrupt(format!("row {id} in {table}: {err}")))?;
            Ok(StoredRow {
                id: RowId::new(id),
                values,
            })
        })
        .collect()
}

/// Loads the next identifier for `table` (1 for new tables).
fn load_next_id(connection: &Connection, table: &TableName) -> Result<u64, SqliteStoreError> {
    let next: Option<i64> = connection
        .query_row(
            "SELECT next_id FROM table_sequences WHERE table_name = ?1",
            params![table.as_str()],
            |row| row.get(0),
        )
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match next {
        None => Ok(1),
        Some(value) => u64::try_from(value)
            .map_err(|_| SqliteStoreError::Corrupt(format!("negative sequence for {table}"))),
    }
}

/// Encodes a row, enforcing the size limit.
fn encode_row(values: &Row) -> Result<Vec<u8>, SqliteStoreError> {
    let bytes =
        serde_json::to_vec(values).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if bytes.len() > MAX_ROW_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_ROW_BYTES,
            actual_bytes: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Converts a row identifier into its `SQLite` integer form.
fn row_id_to_sql(id: RowId) -> Result<i64, SqliteStoreError> {
    i64::try_from(id.get()).map_err(|_| SqliteStoreError::Invalid(format!("row id {id} overflow")))
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
