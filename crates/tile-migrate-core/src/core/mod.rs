// crates/tile-migrate-core/src/core/mod.rs
// ============================================================================
// Module: Tile Migrate Core Types
// Description: Records, settings, events, and reports shared by the pipeline.
// Purpose: Provide the data model consumed by interfaces and runtime modules.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types are plain data: they carry no I/O and no registry handles.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod event;
pub mod pipeline;
pub mod record;
pub mod report;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use event::MigrationEvent;
pub use event::MigrationLogLine;
pub use pipeline::PipelineConfig;
pub use pipeline::PlanStrategy;
pub use pipeline::RetryPolicy;
pub use record::AccountId;
pub use record::Record;
pub use record::RecordField;
pub use record::TileId;
pub use report::BatchReport;
pub use report::BatchStatus;
pub use report::ErrorKind;
pub use report::ExecutionReport;
pub use report::FailureDetail;
pub use report::MigrationRunResult;
pub use report::MigrationState;
pub use report::RecordMismatch;
pub use report::RunError;
pub use report::VerificationReport;
pub use report::duration_millis;
