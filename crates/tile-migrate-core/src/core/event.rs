// crates/tile-migrate-core/src/core/event.rs
// ============================================================================
// Module: Migration Events
// Description: Structured progress events emitted by the migration runtime.
// Purpose: Give operators batch-level progress without formatting output.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Events are serialized as flat JSON objects tagged by an `event` field.
//! They describe progress only; the authoritative outcome is always the
//! [`MigrationRunResult`](crate::core::MigrationRunResult).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::pipeline::PlanStrategy;
use crate::core::record::TileId;
use crate::core::report::ErrorKind;
use crate::core::report::MigrationState;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Progress event emitted while a run advances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MigrationEvent {
    /// A run has started.
    RunStarted {
        /// Records per batch.
        batch_size: usize,
        /// Attempts per read.
        max_attempts: u32,
    },
    /// The destination was already finalized; the run did nothing.
    RunAbortedFinalized,
    /// The pending set has been computed.
    PlanCompleted {
        /// Keys enumerated from the source.
        source_ids: usize,
        /// Keys pending migration.
        pending: usize,
        /// Planner strategy used.
        strategy: PlanStrategy,
    },
    /// A registry read failed transiently and will be retried.
    FetchRetry {
        /// Operation label.
        operation: String,
        /// Key involved, when the read is per-key.
        id: Option<TileId>,
        /// Attempt that failed (1-based).
        attempt: u32,
        /// Attempt bound.
        max_attempts: u32,
        /// Failure message.
        error: String,
    },
    /// A batch is being assembled.
    BatchStarted {
        /// Zero-based batch index.
        index: usize,
        /// Total planned batches.
        total: usize,
        /// Keys in the batch.
        ids: usize,
    },
    /// A batch was written.
    BatchWritten {
        /// Zero-based batch index.
        index: usize,
        /// Total planned batches.
        total: usize,
        /// Records in the batch.
        records: usize,
        /// Records written so far in this run.
        written_total: usize,
        /// Source fetch attempts spent on the batch.
        fetch_attempts: u32,
    },
    /// A batch failed and the run is aborting.
    BatchFailed {
        /// Zero-based batch index.
        index: usize,
        /// Total planned batches.
        total: usize,
        /// Failure classification.
        kind: ErrorKind,
        /// Failure message.
        error: String,
    },
    /// The run stopped at a batch boundary on request.
    RunCancelled {
        /// Index of the first batch not started.
        next_batch: usize,
        /// Batches written before stopping.
        succeeded_batches: usize,
    },
    /// Verification finished.
    VerificationCompleted {
        /// Keys compared field by field.
        checked: usize,
        /// Missing key count.
        missing: usize,
        /// Mismatched record count.
        mismatches: usize,
        /// Unexpected destination key count.
        unexpected: usize,
        /// Source record count.
        source_count: u64,
        /// Destination record count.
        destination_count: u64,
        /// Verification verdict.
        success: bool,
    },
    /// The run reached a terminal state.
    RunFinished {
        /// Terminal state.
        state: MigrationState,
        /// Wall time in milliseconds.
        elapsed_ms: u64,
    },
}

impl MigrationEvent {
    /// Returns the event label used on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RunStarted {
                ..
            } => "run_started",
            Self::RunAbortedFinalized => "run_aborted_finalized",
            Self::PlanCompleted {
                ..
            } => "plan_completed",
            Self::FetchRetry {
                ..
            } => "fetch_retry",
            Self::BatchStarted {
                ..
            } => "batch_started",
            Self::BatchWritten {
                ..
            } => "batch_written",
            Self::BatchFailed {
                ..
            } => "batch_failed",
            Self::RunCancelled {
                ..
            } => "run_cancelled",
            Self::VerificationCompleted {
                ..
            } => "verification_completed",
            Self::RunFinished {
                ..
            } => "run_finished",
        }
    }
}

/// Serialized event line with a wall-clock timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationLogLine<'a> {
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Event payload.
    #[serde(flatten)]
    pub event: &'a MigrationEvent,
}
