// crates/tile-migrate-cli/src/registry.rs
// ============================================================================
// Module: Configured Registries
// Description: Registry adapter selected by configuration.
// Purpose: Let one orchestrator type drive any configured backend pair.
// Dependencies: tile-migrate-config, tile-migrate-core, tile-migrate-http,
// tile-migrate-store-sqlite
// ============================================================================

//! ## Overview
//! [`AnyRegistry`] wraps each supported backend and forwards both registry
//! ports, so source and destination may be mixed freely (for example an
//! HTTP source migrating into a `SQLite` destination).
//!
//! HTTP clients block; open them from a blocking worker thread, never from
//! inside an async task.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::io;
use std::sync::Arc;

use thiserror::Error;
use tile_migrate_config::LogSink;
use tile_migrate_config::LoggingConfig;
use tile_migrate_config::RegistryConfig;
use tile_migrate_core::DestinationRegistry;
use tile_migrate_core::FileEventSink;
use tile_migrate_core::MigrationEventSink;
use tile_migrate_core::NoopEventSink;
use tile_migrate_core::Record;
use tile_migrate_core::RegistryError;
use tile_migrate_core::SourceRegistry;
use tile_migrate_core::StderrEventSink;
use tile_migrate_core::TileId;
use tile_migrate_http::HttpRegistry;
use tile_migrate_http::HttpRegistryError;
use tile_migrate_store_sqlite::SqliteRegistry;
use tile_migrate_store_sqlite::SqliteRegistryConfig;
use tile_migrate_store_sqlite::SqliteRegistryError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure opening a configured registry.
#[derive(Debug, Error)]
pub enum RegistryOpenError {
    /// `SQLite` registry could not be opened.
    #[error(transparent)]
    Sqlite(#[from] SqliteRegistryError),
    /// HTTP registry client could not be created.
    #[error(transparent)]
    Http(#[from] HttpRegistryError),
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry backend chosen at runtime.
#[derive(Clone)]
pub enum AnyRegistry {
    /// `SQLite` database file.
    Sqlite(SqliteRegistry),
    /// Remote registry over HTTP.
    Http(HttpRegistry),
}

impl AnyRegistry {
    /// Opens the source registry described by `config`.
    ///
    /// `SQLite` sources are always opened read-only: a missing file is an
    /// error and the database is never created, migrated, or re-journaled.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryOpenError`] when the backend cannot be opened.
    pub fn open_source(config: &RegistryConfig) -> Result<Self, RegistryOpenError> {
        match config {
            RegistryConfig::Sqlite(config) => {
                let config = SqliteRegistryConfig {
                    read_only: true,
                    ..config.clone()
                };
                Ok(Self::Sqlite(SqliteRegistry::open(config)?))
            }
            RegistryConfig::Http(config) => Ok(Self::Http(HttpRegistry::new(config.clone())?)),
        }
    }

    /// Opens the destination registry described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryOpenError`] when the backend cannot be opened.
    pub fn open_destination(config: &RegistryConfig) -> Result<Self, RegistryOpenError> {
        match config {
            RegistryConfig::Sqlite(config) => {
                Ok(Self::Sqlite(SqliteRegistry::open(config.clone())?))
            }
            RegistryConfig::Http(config) => Ok(Self::Http(HttpRegistry::new(config.clone())?)),
        }
    }
}

impl SourceRegistry for AnyRegistry {
    fn list_all_ids(&self) -> Result<Vec<TileId>, RegistryError> {
        match self {
            Self::Sqlite(registry) => registry.list_all_ids(),
            Self::Http(registry) => registry.list_all_ids(),
        }
    }

    fn get_record(&self, id: TileId) -> Result<Record, RegistryError> {
        match self {
            Self::Sqlite(registry) => SourceRegistry::get_record(registry, id),
            Self::Http(registry) => SourceRegistry::get_record(registry, id),
        }
    }

    fn total_count(&self) -> Result<u64, RegistryError> {
        match self {
            Self::Sqlite(registry) => SourceRegistry::total_count(registry),
            Self::Http(registry) => SourceRegistry::total_count(registry),
        }
    }
}

impl DestinationRegistry for AnyRegistry {
    fn list_existing_ids(&self) -> Result<BTreeSet<TileId>, RegistryError> {
        match self {
            Self::Sqlite(registry) => registry.list_existing_ids(),
            Self::Http(registry) => registry.list_existing_ids(),
        }
    }

    fn exists(&self, id: TileId) -> Result<bool, RegistryError> {
        match self {
            Self::Sqlite(registry) => registry.exists(id),
            Self::Http(registry) => registry.exists(id),
        }
    }

    fn get_record(&self, id: TileId) -> Result<Record, RegistryError> {
        match self {
            Self::Sqlite(registry) => DestinationRegistry::get_record(registry, id),
            Self::Http(registry) => DestinationRegistry::get_record(registry, id),
        }
    }

    fn write_batch(&self, records: &[Record]) -> Result<(), RegistryError> {
        match self {
            Self::Sqlite(registry) => registry.write_batch(records),
            Self::Http(registry) => registry.write_batch(records),
        }
    }

    fn is_finalized(&self) -> Result<bool, RegistryError> {
        match self {
            Self::Sqlite(registry) => registry.is_finalized(),
            Self::Http(registry) => registry.is_finalized(),
        }
    }

    fn total_count(&self) -> Result<u64, RegistryError> {
        match self {
            Self::Sqlite(registry) => DestinationRegistry::total_count(registry),
            Self::Http(registry) => DestinationRegistry::total_count(registry),
        }
    }
}

// ============================================================================
// SECTION: Event Sink
// ============================================================================

/// Opens the progress sink selected by the logging config.
///
/// # Errors
///
/// Returns an I/O error when the file sink cannot be opened.
pub fn open_event_sink(config: &LoggingConfig) -> io::Result<Arc<dyn MigrationEventSink>> {
    match (config.sink, &config.path) {
        (LogSink::File, Some(path)) => Ok(Arc::new(FileEventSink::new(path)?)),
        (LogSink::File, None) => {
            Err(io::Error::new(io::ErrorKind::InvalidInput, "file sink requires a path"))
        }
        (LogSink::Stderr, _) => Ok(Arc::new(StderrEventSink)),
        (LogSink::None, _) => Ok(Arc::new(NoopEventSink)),
    }
}
