// crates/tile-migrate-cli/src/lib.rs
// ============================================================================
// Module: Tile Migrate CLI Library
// Description: Runtime wiring shared by the tile-migrate binary.
// Purpose: Build registries and event sinks from validated configuration.
// Dependencies: tile-migrate-config, tile-migrate-core, tile-migrate-http,
// tile-migrate-store-sqlite
// ============================================================================

//! ## Overview
//! Turns a validated [`tile_migrate_config::MigrateConfig`] into live
//! registry adapters and a progress sink. The binary only parses arguments,
//! dispatches, and prints results.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use registry::AnyRegistry;
pub use registry::RegistryOpenError;
pub use registry::open_event_sink;
