// crates/tile-migrate-store-sqlite/src/registry.rs
// ============================================================================
// Module: SQLite Registry
// Description: Source and destination registry backed by a SQLite file.
// Purpose: Persist tile records with atomic batch writes and a finalize flag.
// Dependencies: tile-migrate-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! [`SqliteRegistry`] stores one row per tile record plus a single-row
//! finalize flag. Batch writes run inside one transaction: either every
//! record of the batch is committed or none is. Lock contention surfaces as
//! a transient error so pipeline reads can retry it.
//!
//! Security posture: database contents are untrusted; rows that cannot be
//! represented as records fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;
use tile_migrate_core::AccountId;
use tile_migrate_core::DestinationRegistry;
use tile_migrate_core::Record;
use tile_migrate_core::RegistryError;
use tile_migrate_core::SourceRegistry;
use tile_migrate_core::TileId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the registry.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Column list shared by record queries.
const RECORD_COLUMNS: &str = "id, owner, metadata_ref, payment_flag, created_at, original_buyer";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
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

/// Configuration for a `SQLite` registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteRegistryConfig {
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
    /// Opens an existing database without write access.
    #[serde(default)]
    pub read_only: bool,
}

impl SqliteRegistryConfig {
    /// Returns a read-write config with default pragmas for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_only: false,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
pub(crate) const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` registry errors.
#[derive(Debug, Error)]
pub enum SqliteRegistryError {
    /// Registry I/O error.
    #[error("sqlite registry io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite registry db error: {0}")]
    Db(String),
    /// Database busy or locked by another connection.
    #[error("sqlite registry busy: {0}")]
    Busy(String),
    /// Registry schema version mismatch.
    #[error("sqlite registry version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid registry data or arguments.
    #[error("sqlite registry invalid data: {0}")]
    Invalid(String),
    /// Record key absent.
    #[error("sqlite registry record not found: {0}")]
    NotFound(TileId),
    /// Destination finalize flag is set.
    #[error("sqlite registry is finalized")]
    Finalized,
}

impl From<rusqlite::Error> for SqliteRegistryError {
    fn from(error: rusqlite::Error) -> Self {
        match error.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
                Self::Busy(error.to_string())
            }
            _ => Self::Db(error.to_string()),
        }
    }
}

impl From<SqliteRegistryError> for RegistryError {
    fn from(error: SqliteRegistryError) -> Self {
        match error {
            SqliteRegistryError::Busy(_) => Self::Transient(error.to_string()),
            SqliteRegistryError::NotFound(id) => Self::NotFound(id),
            SqliteRegistryError::Finalized => Self::Finalized,
            SqliteRegistryError::Io(_)
            | SqliteRegistryError::Db(_)
            | SqliteRegistryError::VersionMismatch(_)
            | SqliteRegistryError::Invalid(_) => Self::Fatal(error.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// `SQLite`-backed tile registry.
#[derive(Clone)]
pub struct SqliteRegistry {
    /// Registry configuration.
    config: SqliteRegistryConfig,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteRegistry {
    /// Opens (and for writable registries, initializes) a `SQLite` registry.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteRegistryError`] when the database cannot be opened or
    /// its schema is missing or unsupported.
    pub fn open(config: SqliteRegistryConfig) -> Result<Self, SqliteRegistryError> {
        validate_registry_path(&config.path, config.read_only)?;
        let connection = if config.read_only {
            let connection = open_read_only(&config)?;
            check_schema(&connection)?;
            connection
        } else {
            ensure_parent_dir(&config.path)?;
            let mut connection = open_read_write(&config)?;
            initialize_schema(&mut connection)?;
            connection
        };
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the registry configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteRegistryConfig {
        &self.config
    }

    /// Sets the finalize flag. Once set it cannot be cleared.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteRegistryError`] when the registry is read-only or the
    /// update fails.
    pub fn finalize(&self) -> Result<(), SqliteRegistryError> {
        self.ensure_writable()?;
        self.lock()?.execute("UPDATE registry_flags SET finalized = 1", params![])?;
        Ok(())
    }

    /// Writes `records` atomically.
    fn write_records(&self, records: &[Record]) -> Result<(), SqliteRegistryError> {
        self.ensure_writable()?;
        if records.is_empty() {
            return Err(SqliteRegistryError::Invalid("batch is empty".to_string()));
        }
        let mut guard = self.lock()?;
        let tx = guard.transaction()?;
        if read_finalized(&tx)? {
            return Err(SqliteRegistryError::Finalized);
        }
        for record in records {
            let id = to_sql_integer(record.id.get(), "id")?;
            let exists: Option<i64> = tx
                .query_row("SELECT 1 FROM records WHERE id = ?1", params![id], |row| row.get(0))
                .optional()?;
            if exists.is_some() {
                return Err(SqliteRegistryError::Invalid(format!(
                    "duplicate record id {}",
                    record.id
                )));
            }
            tx.execute(
                "INSERT INTO records (id, owner, metadata_ref, payment_flag, created_at, \
                 original_buyer) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    record.owner.as_str(),
                    record.metadata_ref,
                    record.payment_flag,
                    to_sql_integer(record.created_at, "created_at")?,
                    record.original_buyer.as_str()
                ],
            )?;
        }
        tx.commit()?;
        drop(guard);
        Ok(())
    }

    /// Loads all ids in ascending order.
    fn load_ids(&self) -> Result<Vec<TileId>, SqliteRegistryError> {
        let guard = self.lock()?;
        let mut statement = guard.prepare_cached("SELECT id FROM records ORDER BY id")?;
        let rows = statement.query_map(params![], |row| row.get::<_, i64>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(TileId::new(from_sql_integer(row?, "id")?));
        }
        Ok(ids)
    }

    /// Loads a single record.
    fn load_record(&self, id: TileId) -> Result<Record, SqliteRegistryError> {
        let key = to_sql_integer(id.get(), "id")?;
        let guard = self.lock()?;
        let row = guard
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1"),
                params![key],
                |row| {
                    Ok(RecordRow {
                        id: row.get(0)?,
                        owner: row.get(1)?,
                        metadata_ref: row.get(2)?,
                        payment_flag: row.get(3)?,
                        created_at: row.get(4)?,
                        original_buyer: row.get(5)?,
                    })
                },
            )
            .optional()?;
        drop(guard);
        row.ok_or(SqliteRegistryError::NotFound(id))?.into_record()
    }

    /// Returns true when a record with `id` exists.
    fn contains(&self, id: TileId) -> Result<bool, SqliteRegistryError> {
        let key = to_sql_integer(id.get(), "id")?;
        let found: Option<i64> = self
            .lock()?
            .query_row("SELECT 1 FROM records WHERE id = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Counts stored records.
    fn count(&self) -> Result<u64, SqliteRegistryError> {
        let count: i64 =
            self.lock()?.query_row("SELECT COUNT(*) FROM records", params![], |row| row.get(0))?;
        from_sql_integer(count, "count")
    }

    /// Reads the finalize flag.
    fn finalized(&self) -> Result<bool, SqliteRegistryError> {
        read_finalized(&*self.lock()?)
    }

    /// Rejects writes on read-only registries.
    fn ensure_writable(&self) -> Result<(), SqliteRegistryError> {
        if self.config.read_only {
            return Err(SqliteRegistryError::Invalid("registry opened read-only".to_string()));
        }
        Ok(())
    }

    /// Acquires the connection lock.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteRegistryError> {
        self.connection.lock().map_err(|_| SqliteRegistryError::Db("mutex poisoned".to_string()))
    }
}

impl SourceRegistry for SqliteRegistry {
    fn list_all_ids(&self) -> Result<Vec<TileId>, RegistryError> {
        Ok(self.load_ids()?)
    }

    fn get_record(&self, id: TileId) -> Result<Record, RegistryError> {
        Ok(self.load_record(id)?)
    }

    fn total_count(&self) -> Result<u64, RegistryError> {
        Ok(self.count()?)
    }
}

impl DestinationRegistry for SqliteRegistry {
    fn list_existing_ids(&self) -> Result<BTreeSet<TileId>, RegistryError> {
        Ok(self.load_ids()?.into_iter().collect())
    }

    fn exists(&self, id: TileId) -> Result<bool, RegistryError> {
        Ok(self.contains(id)?)
    }

    fn get_record(&self, id: TileId) -> Result<Record, RegistryError> {
        Ok(self.load_record(id)?)
    }

    fn write_batch(&self, records: &[Record]) -> Result<(), RegistryError> {
        self.write_records(records).map_err(|error| match error {
            SqliteRegistryError::Finalized => RegistryError::Finalized,
            other => RegistryError::Fatal(other.to_string()),
        })
    }

    fn is_finalized(&self) -> Result<bool, RegistryError> {
        Ok(self.finalized()?)
    }

    fn total_count(&self) -> Result<u64, RegistryError> {
        Ok(self.count()?)
    }
}

// ============================================================================
// SECTION: Rows
// ============================================================================

/// Raw column values for one record row.
struct RecordRow {
    /// `id` column.
    id: i64,
    /// `owner` column.
    owner: String,
    /// `metadata_ref` column.
    metadata_ref: String,
    /// `payment_flag` column.
    payment_flag: bool,
    /// `created_at` column.
    created_at: i64,
    /// `original_buyer` column.
    original_buyer: String,
}

impl RecordRow {
    /// Converts the row into a record, rejecting negative integers.
    fn into_record(self) -> Result<Record, SqliteRegistryError> {
        Ok(Record {
            id: TileId::new(from_sql_integer(self.id, "id")?),
            owner: AccountId::new(self.owner),
            metadata_ref: self.metadata_ref,
            payment_flag: self.payment_flag,
            created_at: from_sql_integer(self.created_at, "created_at")?,
            original_buyer: AccountId::new(self.original_buyer),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts an unsigned value into a `SQLite` integer.
fn to_sql_integer(value: u64, column: &str) -> Result<i64, SqliteRegistryError> {
    i64::try_from(value)
        .map_err(|_| SqliteRegistryError::Invalid(format!("{column} exceeds sqlite range")))
}

/// Converts a `SQLite` integer into an unsigned value.
fn from_sql_integer(value: i64, column: &str) -> Result<u64, SqliteRegistryError> {
    u64::try_from(value).map_err(|_| SqliteRegistryError::Invalid(format!("negative {column}")))
}

/// Reads the finalize flag from the flags table.
fn read_finalized(connection: &Connection) -> Result<bool, SqliteRegistryError> {
    let finalized: Option<bool> = connection
        .query_row("SELECT finalized FROM registry_flags LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    finalized.ok_or_else(|| SqliteRegistryError::Invalid("registry flags row missing".to_string()))
}

/// Ensures the parent directory for the registry exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteRegistryError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteRegistryError::Io("registry path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteRegistryError::Io(err.to_string()))
}

/// Validates registry paths for safety limits.
fn validate_registry_path(path: &Path, must_exist: bool) -> Result<(), SqliteRegistryError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteRegistryError::Invalid("registry path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteRegistryError::Invalid(
                "registry path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteRegistryError::Invalid(
            "registry path must be a file, not a directory".to_string(),
        ));
    }
    if must_exist && !path.exists() {
        return Err(SqliteRegistryError::Io(format!(
            "read-only registry not found: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Opens a writable `SQLite` connection with durable pragmas.
fn open_read_write(config: &SqliteRegistryConfig) -> Result<Connection, SqliteRegistryError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(connection)
}

/// Opens a read-only `SQLite` connection.
fn open_read_only(config: &SqliteRegistryConfig) -> Result<Connection, SqliteRegistryError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(connection)
}

/// Validates the schema version of an existing database.
fn check_schema(connection: &Connection) -> Result<(), SqliteRegistryError> {
    let version: Option<i64> = connection
        .query_row("SELECT version FROM registry_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    match version {
        Some(value) if value == SCHEMA_VERSION => Ok(()),
        Some(value) => Err(SqliteRegistryError::VersionMismatch(format!(
            "unsupported schema version: {value}"
        ))),
        None => Err(SqliteRegistryError::VersionMismatch("schema version missing".to_string())),
    }
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteRegistryError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS registry_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM registry_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    match version {
        None => {
            tx.execute("INSERT INTO registry_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS registry_flags (
                    finalized INTEGER NOT NULL CHECK (finalized IN (0, 1))
                );
                INSERT INTO registry_flags (finalized) VALUES (0);
                CREATE TABLE IF NOT EXISTS records (
                    id INTEGER PRIMARY KEY CHECK (id >= 0),
                    owner TEXT NOT NULL,
                    metadata_ref TEXT NOT NULL,
                    payment_flag INTEGER NOT NULL CHECK (payment_flag IN (0, 1)),
                    created_at INTEGER NOT NULL CHECK (created_at >= 0),
                    original_buyer TEXT NOT NULL
                );",
            )?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteRegistryError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit()?;
    Ok(())
}
