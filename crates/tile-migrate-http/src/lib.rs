// crates/tile-migrate-http/src/lib.rs
// ============================================================================
// Module: HTTP Tile Registry
// Description: Remote registry adapter over a small JSON HTTP protocol.
// Purpose: Connect the migration pipeline to networked registries.
// Dependencies: tile-migrate-core, reqwest
// ============================================================================

//! ## Overview
//! This crate provides [`HttpRegistry`], a blocking client implementing both
//! registry ports against a remote service. Failures are classified so that
//! only reads are ever retried by the pipeline.
//! Security posture: network peers are untrusted; HTTPS is required unless
//! explicitly disabled for local testing.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use registry::HttpRegistry;
pub use registry::HttpRegistryConfig;
pub use registry::HttpRegistryError;
pub use registry::RegistryStatus;
