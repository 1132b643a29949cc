// crates/tile-migrate-config/src/lib.rs
// ============================================================================
// Module: Tile Migrate Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for tile-migrate.toml semantics.
// Dependencies: tile-migrate-core, serde, toml
// ============================================================================

//! ## Overview
//! `tile-migrate-config` defines the configuration model for a migration
//! run: the source and destination registries, batching, retry, pacing, and
//! progress output. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
