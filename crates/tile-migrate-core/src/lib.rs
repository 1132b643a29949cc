// crates/tile-migrate-core/src/lib.rs
// ============================================================================
// Module: Tile Migrate Core Library
// Description: Public API surface for the migrate-and-verify pipeline.
// Purpose: Expose core types, registry ports, and runtime stages.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Tile Migrate moves every record from a deprecated registry to its
//! replacement and proves the transfer complete before the destination may be
//! finalized. The pipeline runs Planner, Executor, and Verifier in strict
//! sequence against injected registry ports, pacing every remote call and
//! retrying only transient read failures.
//!
//! Re-running after an aborted batch is always safe: the planner recomputes
//! the pending set from live destination state, so written keys drop out.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::Clock;
pub use interfaces::DestinationRegistry;
pub use interfaces::MigrationEventSink;
pub use interfaces::RegistryError;
pub use interfaces::SourceRegistry;
pub use runtime::BatchExecutor;
pub use runtime::CancellationToken;
pub use runtime::CollectingEventSink;
pub use runtime::FileEventSink;
pub use runtime::InMemoryRegistry;
pub use runtime::ManualClock;
pub use runtime::MigrationOrchestrator;
pub use runtime::NoopEventSink;
pub use runtime::Pacer;
pub use runtime::Plan;
pub use runtime::Planner;
pub use runtime::ReadError;
pub use runtime::Retried;
pub use runtime::RetryFailure;
pub use runtime::StageContext;
pub use runtime::StderrEventSink;
pub use runtime::SystemClock;
pub use runtime::Verifier;
pub use runtime::partition;
pub use runtime::retry_read;
