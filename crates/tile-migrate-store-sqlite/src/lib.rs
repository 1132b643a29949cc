// crates/tile-migrate-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Tile Registry
// Description: Durable source/destination registry backend using SQLite.
// Purpose: Provide a local, transactional registry for migrations and tests.
// Dependencies: tile-migrate-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed registry implementing both
//! [`tile_migrate_core::SourceRegistry`] and
//! [`tile_migrate_core::DestinationRegistry`]. Batch writes are
//! transactional and guarded by a persistent finalize flag.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use registry::SqliteRegistry;
pub use registry::SqliteRegistryConfig;
pub use registry::SqliteRegistryError;
pub use registry::SqliteStoreMode;
pub use registry::SqliteSyncMode;
