// crates/tile-migrate-core/src/runtime/mod.rs
// ============================================================================
// Module: Tile Migrate Runtime
// Description: Pipeline stages, pacing, retries, and reference adapters.
// Purpose: Execute migration runs against injected registry ports.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime stages share one [`StageContext`] carrying the clock, event sink,
//! and pipeline settings. Stages borrow the registries; only the
//! [`MigrationOrchestrator`] owns them.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cancel;
pub mod clock;
pub mod context;
pub mod events;
pub mod executor;
pub mod memory;
pub mod orchestrator;
pub mod planner;
pub mod retry;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cancel::CancellationToken;
pub use clock::ManualClock;
pub use clock::Pacer;
pub use clock::SystemClock;
pub use context::ReadError;
pub use context::StageContext;
pub use events::CollectingEventSink;
pub use events::FileEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use executor::BatchExecutor;
pub use executor::partition;
pub use memory::InMemoryRegistry;
pub use orchestrator::FINALIZED_MESSAGE;
pub use orchestrator::MigrationOrchestrator;
pub use planner::Plan;
pub use planner::Planner;
pub use retry::Retried;
pub use retry::RetryFailure;
pub use retry::retry_read;
pub use verifier::Verifier;
