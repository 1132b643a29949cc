// crates/tile-migrate-core/src/core/report.rs
// ============================================================================
// Module: Migration Reports
// Description: Machine-readable outputs of planning, execution, and verification.
// Purpose: Define the sole output contract exposed to administrative callers.
// Dependencies: crate::core::record, serde
// ============================================================================

//! ## Overview
//! Reports are plain serializable values. Hosts render them, persist them, or
//! gate finalization on them; nothing outside the runtime may depend on the
//! pipeline's internal state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::core::record::Record;
use crate::core::record::RecordField;
use crate::core::record::TileId;

// ============================================================================
// SECTION: Error Classification
// ============================================================================

/// Failure classification carried by reports and events.
///
/// # Invariants
/// - Variants are stable for report labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transient fault observed on a single, unretried call.
    Transient,
    /// Transient fault that exhausted its retry budget; fatal to the run.
    RetriesExhausted,
    /// Key absent where presence was assumed.
    NotFound,
    /// Destination finalize flag was set.
    Finalized,
    /// Rejected or malformed request.
    Fatal,
    /// Run stopped at a batch boundary on request.
    Cancelled,
}

impl ErrorKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::RetriesExhausted => "retries_exhausted",
            Self::NotFound => "not_found",
            Self::Finalized => "finalized",
            Self::Fatal => "fatal",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified failure with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// Failure classification.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

// ============================================================================
// SECTION: Execution Report
// ============================================================================

/// Outcome of a single batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every record in the batch was written.
    Written,
    /// A source fetch failed; nothing from the batch was written.
    FetchFailed {
        /// Key whose fetch failed.
        id: TileId,
        /// Attempts made for that key.
        attempts: u32,
        /// Final failure.
        failure: FailureDetail,
    },
    /// The destination rejected the batch write.
    WriteFailed {
        /// Final failure.
        failure: FailureDetail,
    },
}

/// Per-batch execution record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Zero-based batch index.
    pub index: usize,
    /// Keys assigned to the batch, in plan order.
    pub ids: Vec<TileId>,
    /// Total source fetch attempts spent on the batch.
    pub fetch_attempts: u32,
    /// Batch outcome.
    #[serde(flatten)]
    pub status: BatchStatus,
}

impl BatchReport {
    /// Returns true when the batch was written.
    #[must_use]
    pub const fn is_written(&self) -> bool {
        matches!(self.status, BatchStatus::Written)
    }
}

/// Result of executing a plan.
///
/// # Invariants
/// - `batches` only lists batches that were attempted, in order.
/// - At most the last attempted batch is not [`BatchStatus::Written`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Number of keys in the plan.
    pub requested: usize,
    /// Number of records written to the destination.
    pub written: usize,
    /// Batch size used for partitioning.
    pub batch_size: usize,
    /// Number of batches the plan partitions into.
    pub planned_batches: usize,
    /// Attempted batches.
    pub batches: Vec<BatchReport>,
    /// Count of batches written.
    pub succeeded_batches: usize,
    /// Index of the batch that aborted the run, if any.
    pub failed_batch: Option<usize>,
    /// True when the run stopped on a cancellation request.
    pub cancelled: bool,
    /// Wall time spent executing, in milliseconds.
    pub elapsed_ms: u64,
}

impl ExecutionReport {
    /// Returns true when every planned batch was written.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed_batch.is_none()
            && !self.cancelled
            && self.succeeded_batches == self.planned_batches
    }

    /// Returns the failure that aborted execution, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&FailureDetail> {
        self.batches.iter().rev().find_map(|batch| match &batch.status {
            BatchStatus::Written => None,
            BatchStatus::FetchFailed {
                failure, ..
            }
            | BatchStatus::WriteFailed {
                failure,
            } => Some(failure),
        })
    }
}

// ============================================================================
// SECTION: Verification Report
// ============================================================================

/// A key present on both sides whose records differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMismatch {
    /// Key of the mismatched record.
    pub id: TileId,
    /// Fields that differ.
    pub fields: Vec<RecordField>,
    /// Record as read from the source.
    pub source: Record,
    /// Record as read from the destination.
    pub destination: Record,
}

/// Field-level comparison of source and destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Source keys absent from the destination, in source order.
    pub missing: Vec<TileId>,
    /// Records that differ between registries.
    pub mismatches: Vec<RecordMismatch>,
    /// Destination keys absent from the source, ascending.
    pub unexpected: Vec<TileId>,
    /// Number of keys compared field by field.
    pub checked: usize,
    /// Source record count.
    pub source_count: u64,
    /// Destination record count.
    pub destination_count: u64,
    /// True when both counts agree.
    pub counts_match: bool,
    /// True when nothing is missing, nothing differs, and counts agree.
    pub success: bool,
}

// ============================================================================
// SECTION: Run Result
// ============================================================================

/// Orchestrator state.
///
/// # Invariants
/// - `NothingToMigrate`, `Aborted`, `VerificationFailed`, and `Completed`
///   are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    /// Run not started.
    Idle,
    /// Computing the pending set.
    Planning,
    /// Pending set was empty (terminal, success).
    NothingToMigrate,
    /// Writing batches.
    ExecutingBatches,
    /// A fatal failure stopped the run (terminal, failure).
    Aborted,
    /// Comparing registries.
    Verifying,
    /// Verification found discrepancies (terminal, failure).
    VerificationFailed,
    /// Migration proven complete (terminal, success).
    Completed,
}

impl MigrationState {
    /// Returns a stable label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Planning => "planning",
            Self::NothingToMigrate => "nothing_to_migrate",
            Self::ExecutingBatches => "executing_batches",
            Self::Aborted => "aborted",
            Self::Verifying => "verifying",
            Self::VerificationFailed => "verification_failed",
            Self::Completed => "completed",
        }
    }

    /// Returns true for terminal states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::NothingToMigrate | Self::Aborted | Self::VerificationFailed | Self::Completed
        )
    }

    /// Returns true for successful terminal states.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::NothingToMigrate | Self::Completed)
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure attached to an aborted run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    /// State the run was in when it failed.
    pub stage: MigrationState,
    /// Failure classification.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

/// Structured result of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRunResult {
    /// Terminal state.
    pub state: MigrationState,
    /// Every state visited, starting with [`MigrationState::Idle`].
    pub transitions: Vec<MigrationState>,
    /// Pending keys computed by the planner.
    pub pending: Vec<TileId>,
    /// Execution report when batches were attempted.
    pub execution: Option<ExecutionReport>,
    /// Verification report when verification ran to completion.
    pub verification: Option<VerificationReport>,
    /// Failure that aborted the run, if any.
    pub error: Option<RunError>,
    /// Human-readable one-line summary.
    pub summary: String,
    /// Wall time for the whole run, in milliseconds.
    pub elapsed_ms: u64,
    /// True only when the destination may be finalized.
    pub finalization_eligible: bool,
}

impl MigrationRunResult {
    /// Returns true for successful terminal states.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.state.is_success()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
#[must_use]
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
