// crates/tile-migrate-core/src/runtime/executor.rs
// ============================================================================
// Module: Batch Executor
// Description: Fetches pending records and writes them in sequential batches.
// Purpose: Transfer each pending record exactly once under pacing and retries.
// Dependencies: crate::{core, interfaces, runtime::{cancel, context}}
// ============================================================================

//! ## Overview
//! The plan is cut into contiguous batches of at most `batch_size` keys.
//! Batches run strictly one after another: every record of a batch is
//! fetched from the source (paced, with retries), then the whole batch is
//! submitted as one destination write. The first failing batch aborts
//! execution; there is no in-place retry of a batch. Recovery is a fresh run,
//! whose planner skips everything already written.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::BatchReport;
use crate::core::BatchStatus;
use crate::core::ErrorKind;
use crate::core::ExecutionReport;
use crate::core::FailureDetail;
use crate::core::MigrationEvent;
use crate::core::Record;
use crate::core::TileId;
use crate::core::duration_millis;
use crate::interfaces::DestinationRegistry;
use crate::interfaces::SourceRegistry;
use crate::runtime::cancel::CancellationToken;
use crate::runtime::context::StageContext;

// ============================================================================
// SECTION: Partitioning
// ============================================================================

/// Splits a plan into contiguous batches of at most `batch_size` keys.
///
/// A `batch_size` of zero is treated as one.
#[must_use]
pub fn partition(plan: &[TileId], batch_size: usize) -> Vec<&[TileId]> {
    plan.chunks(batch_size.max(1)).collect()
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Sequential batch executor over borrowed registries.
pub struct BatchExecutor<'a, S: ?Sized, D: ?Sized> {
    /// Source registry.
    source: &'a S,
    /// Destination registry.
    destination: &'a D,
    /// Shared stage context.
    ctx: StageContext<'a>,
    /// Optional cancellation flag checked between batches.
    cancel: Option<CancellationToken>,
}

impl<'a, S, D> BatchExecutor<'a, S, D>
where
    S: SourceRegistry + ?Sized,
    D: DestinationRegistry + ?Sized,
{
    /// Creates an executor.
    #[must_use]
    pub const fn new(source: &'a S, destination: &'a D, ctx: StageContext<'a>) -> Self {
        Self {
            source,
            destination,
            ctx,
            cancel: None,
        }
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Executes the plan and reports per-batch outcomes.
    #[must_use]
    pub fn execute(&self, plan: &[TileId]) -> ExecutionReport {
        let started = self.ctx.clock.elapsed();
        let batch_size = self.ctx.config.batch_size.max(1);
        let batches = partition(plan, batch_size);
        let total = batches.len();
        let mut report = ExecutionReport {
            requested: plan.len(),
            written: 0,
            batch_size,
            planned_batches: total,
            batches: Vec::with_capacity(total),
            succeeded_batches: 0,
            failed_batch: None,
            cancelled: false,
            elapsed_ms: 0,
        };
        let mut batch_pacer = self.ctx.batch_pacer();

        for (index, ids) in batches.into_iter().enumerate() {
            if self.stop_if_cancelled(index, &mut report) {
                break;
            }
            batch_pacer.tick();
            if self.stop_if_cancelled(index, &mut report) {
                break;
            }
            self.ctx.events.record(&MigrationEvent::BatchStarted {
                index,
                total,
                ids: ids.len(),
            });
            let batch = self.run_batch(index, ids);
            match &batch.status {
                BatchStatus::Written => {
                    report.written += batch.ids.len();
                    report.succeeded_batches += 1;
                    self.ctx.events.record(&MigrationEvent::BatchWritten {
                        index,
                        total,
                        records: batch.ids.len(),
                        written_total: report.written,
                        fetch_attempts: batch.fetch_attempts,
                    });
                    report.batches.push(batch);
                }
                BatchStatus::FetchFailed {
                    failure, ..
                }
                | BatchStatus::WriteFailed {
                    failure,
                } => {
                    self.ctx.events.record(&MigrationEvent::BatchFailed {
                        index,
                        total,
                        kind: failure.kind,
                        error: failure.message.clone(),
                    });
                    report.failed_batch = Some(index);
                    report.batches.push(batch);
                    break;
                }
            }
        }

        report.elapsed_ms = duration_millis(self.ctx.clock.elapsed().saturating_sub(started));
        report
    }

    /// Marks the report cancelled when the token is set before batch `index`.
    fn stop_if_cancelled(&self, index: usize, report: &mut ExecutionReport) -> bool {
        if !self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return false;
        }
        report.cancelled = true;
        self.ctx.events.record(&MigrationEvent::RunCancelled {
            next_batch: index,
            succeeded_batches: report.succeeded_batches,
        });
        true
    }

    /// Fetches every record of one batch and submits it as a single write.
    fn run_batch(&self, index: usize, ids: &[TileId]) -> BatchReport {
        let mut pacer = self.ctx.item_pacer();
        let mut records: Vec<Record> = Vec::with_capacity(ids.len());
        let mut fetch_attempts: u32 = 0;

        for &id in ids {
            pacer.tick();
            let fetched = self
                .ctx
                .read("source_get_record", Some(id), || self.source.get_record(id));
            match fetched {
                Ok(retried) => {
                    fetch_attempts = fetch_attempts.saturating_add(retried.attempts);
                    if retried.value.id != id {
                        return BatchReport {
                            index,
                            ids: ids.to_vec(),
                            fetch_attempts,
                            status: BatchStatus::FetchFailed {
                                id,
                                attempts: retried.attempts,
                                failure: FailureDetail {
                                    kind: ErrorKind::Fatal,
                                    message: format!(
                                        "source returned record {} for requested id {id}",
                                        retried.value.id
                                    ),
                                },
                            },
                        };
                    }
                    records.push(retried.value);
                }
                Err(error) => {
                    fetch_attempts = fetch_attempts.saturating_add(error.attempts);
                    return BatchReport {
                        index,
                        ids: ids.to_vec(),
                        fetch_attempts,
                        status: BatchStatus::FetchFailed {
                            id,
                            attempts: error.attempts,
                            failure: error.detail(),
                        },
                    };
                }
            }
        }

        let status = match self.destination.write_batch(&records) {
            Ok(()) => BatchStatus::Written,
            Err(error) => BatchStatus::WriteFailed {
                failure: FailureDetail {
                    kind: error.kind(),
                    message: error.to_string(),
                },
            },
        };
        BatchReport {
            index,
            ids: ids.to_vec(),
            fetch_attempts,
            status,
        }
    }
}
