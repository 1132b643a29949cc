// crates/tile-migrate-core/tests/executor.rs
// ============================================================================
// Module: Batch Executor Tests
// Description: Partitioning, retry bounds, pacing, and abort behavior.
// Purpose: Ensure every pending record is written exactly once or not at all.
// Dependencies: tile-migrate-core, proptest
// ============================================================================
//! ## Overview
//! Drives [`BatchExecutor`] against fault-injecting fakes on a manual clock.
//!
//! Security posture: writes are non-idempotent, so a failed batch must never
//! be resubmitted and a fetch failure must never produce a partial write.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::time::Duration;

use proptest::prelude::*;
use tile_migrate_core::BatchExecutor;
use tile_migrate_core::BatchStatus;
use tile_migrate_core::CancellationToken;
use tile_migrate_core::CollectingEventSink;
use tile_migrate_core::ErrorKind;
use tile_migrate_core::InMemoryRegistry;
use tile_migrate_core::ManualClock;
use tile_migrate_core::MigrationEvent;
use tile_migrate_core::Record;
use tile_migrate_core::RegistryError;
use tile_migrate_core::SourceRegistry;
use tile_migrate_core::StageContext;
use tile_migrate_core::TileId;
use tile_migrate_core::partition;

use crate::common::FailingDestination;
use crate::common::FlakySource;
use crate::common::fast_config;
use crate::common::ids;
use crate::common::paced_config;
use crate::common::records;

// ============================================================================
// SECTION: Partitioning
// ============================================================================

/// Verifies the reference example partitions into two batches.
#[test]
fn partition_splits_into_contiguous_batches() {
    let plan = ids(&[10, 11, 12]);
    let batches = partition(&plan, 2);
    assert_eq!(batches, vec![&plan[0 .. 2], &plan[2 .. 3]]);
}

/// Verifies an empty plan yields no batches and a zero size acts as one.
#[test]
fn partition_edge_cases() {
    assert!(partition(&[], 25).is_empty());
    let plan = ids(&[1, 2]);
    assert_eq!(partition(&plan, 0).len(), 2);
}

proptest! {
    #[test]
    fn partition_covers_plan_in_order(
        raw in prop::collection::vec(any::<u64>(), 0 .. 200),
        batch_size in 1usize .. 40,
    ) {
        let plan: Vec<TileId> = raw.into_iter().map(TileId::new).collect();
        let batches = partition(&plan, batch_size);

        prop_assert_eq!(batches.len(), plan.len().div_ceil(batch_size));
        for (index, batch) in batches.iter().enumerate() {
            prop_assert!(!batch.is_empty());
            prop_assert!(batch.len() <= batch_size);
            if index + 1 < batches.len() {
                prop_assert_eq!(batch.len(), batch_size);
            }
        }
        let flattened: Vec<TileId> = batches.concat();
        prop_assert_eq!(flattened, plan);
    }
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Verifies a clean run writes every batch once, in plan order.
#[test]
fn execute_writes_each_batch_once() {
    let source = InMemoryRegistry::with_records(records(&[10, 11, 12], "alice"));
    let destination = InMemoryRegistry::new();
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = fast_config(2);
    let ctx = StageContext::new(&clock, &events, &config);

    let report = BatchExecutor::new(&source, &destination, ctx).execute(&ids(&[10, 11, 12]));

    assert!(report.is_complete());
    assert_eq!(report.written, 3);
    assert_eq!(report.planned_batches, 2);
    assert_eq!(destination.write_log(), vec![ids(&[10, 11]), ids(&[12])]);
    assert_eq!(destination.records(), records(&[10, 11, 12], "alice"));
}

/// Verifies two transient failures are absorbed by the retry bound.
#[test]
fn transient_failures_within_bound_are_retried() {
    let source = FlakySource::new(InMemoryRegistry::with_records(records(&[1, 2], "alice")));
    source.fail_transiently(2, 2);
    let destination = InMemoryRegistry::new();
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = fast_config(25);
    let ctx = StageContext::new(&clock, &events, &config);

    let report = BatchExecutor::new(&source, &destination, ctx).execute(&ids(&[1, 2]));

    assert!(report.is_complete());
    assert_eq!(source.calls(2), 3);
    assert_eq!(report.batches[0].fetch_attempts, 4);
    assert_eq!(destination.write_log(), vec![ids(&[1, 2])]);
    let retries = events
        .events()
        .into_iter()
        .filter(|event| matches!(event, MigrationEvent::FetchRetry { .. }))
        .count();
    assert_eq!(retries, 2);
}

/// Verifies exhausting the retry bound aborts the batch with nothing written.
#[test]
fn transient_failures_beyond_bound_abort_without_write() {
    let source = FlakySource::new(InMemoryRegistry::with_records(records(&[1, 2, 3], "alice")));
    source.fail_transiently(2, 3);
    let destination = FailingDestination::new(InMemoryRegistry::new(), None);
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = fast_config(25);
    let ctx = StageContext::new(&clock, &events, &config);

    let report = BatchExecutor::new(&source, &destination, ctx).execute(&ids(&[1, 2, 3]));

    assert!(!report.is_complete());
    assert_eq!(report.failed_batch, Some(0));
    assert_eq!(report.written, 0);
    assert_eq!(destination.write_calls(), 0);
    assert_eq!(source.calls(2), 3);
    assert_eq!(source.calls(3), 0);
    match &report.batches[0].status {
        BatchStatus::FetchFailed {
            id,
            attempts,
            failure,
        } => {
            assert_eq!(*id, TileId::new(2));
            assert_eq!(*attempts, 3);
            assert_eq!(failure.kind, ErrorKind::RetriesExhausted);
        }
        other => panic!("unexpected status {other:?}"),
    }
}

/// Verifies a not-found fetch is fatal on the first attempt.
#[test]
fn not_found_is_not_retried() {
    let source = FlakySource::new(InMemoryRegistry::with_records(records(&[1], "alice")));
    let destination = InMemoryRegistry::new();
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = fast_config(25);
    let ctx = StageContext::new(&clock, &events, &config);

    let report = BatchExecutor::new(&source, &destination, ctx).execute(&ids(&[1, 99]));

    assert_eq!(source.calls(99), 1);
    assert_eq!(report.failure().map(|failure| failure.kind), Some(ErrorKind::NotFound));
    assert!(destination.write_log().is_empty());
}

/// Verifies a rejected write stops execution after the earlier batches.
#[test]
fn write_failure_aborts_after_successful_batches() {
    let source = InMemoryRegistry::with_records(records(&[1, 2, 3, 4, 5], "alice"));
    let destination = FailingDestination::new(InMemoryRegistry::new(), Some(2));
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = fast_config(2);
    let ctx = StageContext::new(&clock, &events, &config);

    let report = BatchExecutor::new(&source, &destination, ctx).execute(&ids(&[1, 2, 3, 4, 5]));

    assert_eq!(report.succeeded_batches, 1);
    assert_eq!(report.failed_batch, Some(1));
    assert_eq!(report.written, 2);
    assert_eq!(report.batches.len(), 2);
    assert_eq!(destination.write_calls(), 2);
    assert!(matches!(report.batches[1].status, BatchStatus::WriteFailed { .. }));
    assert_eq!(report.failure().map(|failure| failure.kind), Some(ErrorKind::Fatal));
}

/// Verifies a finalized destination rejects the first write.
#[test]
fn finalized_destination_rejects_write() {
    let source = InMemoryRegistry::with_records(records(&[1], "alice"));
    let destination = InMemoryRegistry::new();
    destination.set_finalized(true).unwrap();
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = fast_config(25);
    let ctx = StageContext::new(&clock, &events, &config);

    let report = BatchExecutor::new(&source, &destination, ctx).execute(&ids(&[1]));

    assert_eq!(report.failure().map(|failure| failure.kind), Some(ErrorKind::Finalized));
    assert!(destination.records().is_empty());
}

// ============================================================================
// SECTION: Pacing and Cancellation
// ============================================================================

/// Verifies item and batch delays with no pause after the last call.
#[test]
fn execution_follows_pacing_schedule() {
    let source = InMemoryRegistry::with_records(records(&[1, 2, 3], "alice"));
    let destination = InMemoryRegistry::new();
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = paced_config(2);
    let ctx = StageContext::new(&clock, &events, &config);

    let report = BatchExecutor::new(&source, &destination, ctx).execute(&ids(&[1, 2, 3]));

    assert!(report.is_complete());
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(200), Duration::from_secs(5)]);
    assert_eq!(report.elapsed_ms, 5_200);
}

/// Verifies retry delays are slept between attempts.
#[test]
fn retry_delay_is_slept_between_attempts() {
    let source = FlakySource::new(InMemoryRegistry::with_records(records(&[1], "alice")));
    source.fail_transiently(1, 2);
    let destination = InMemoryRegistry::new();
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = paced_config(25);
    let ctx = StageContext::new(&clock, &events, &config);

    let report = BatchExecutor::new(&source, &destination, ctx).execute(&ids(&[1]));

    assert!(report.is_complete());
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(2); 2]);
}

/// Verifies cancellation stops at the next batch boundary.
#[test]
fn cancellation_stops_before_next_batch() {
    let source = InMemoryRegistry::with_records(records(&[1, 2, 3, 4], "alice"));
    let destination = InMemoryRegistry::new();
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = fast_config(2);
    let ctx = StageContext::new(&clock, &events, &config);
    let token = CancellationToken::new();
    token.cancel();

    let report = BatchExecutor::new(&source, &destination, ctx)
        .with_cancellation(token)
        .execute(&ids(&[1, 2, 3, 4]));

    assert!(report.cancelled);
    assert!(!report.is_complete());
    assert_eq!(report.failed_batch, None);
    assert!(destination.write_log().is_empty());
    assert_eq!(events.names(), vec!["run_cancelled"]);
}

/// Source that sets a cancellation token on its first record fetch.
struct CancellingSource {
    /// Backing records.
    inner: InMemoryRegistry,
    /// Token cancelled mid-batch.
    token: CancellationToken,
}

impl SourceRegistry for CancellingSource {
    fn list_all_ids(&self) -> Result<Vec<TileId>, RegistryError> {
        self.inner.list_all_ids()
    }

    fn get_record(&self, id: TileId) -> Result<Record, RegistryError> {
        self.token.cancel();
        SourceRegistry::get_record(&self.inner, id)
    }

    fn total_count(&self) -> Result<u64, RegistryError> {
        SourceRegistry::total_count(&self.inner)
    }
}

/// Verifies a cancel raised during a batch finishes that batch and stops
/// without sleeping the batch delay.
#[test]
fn cancellation_during_batch_skips_batch_delay() {
    let token = CancellationToken::new();
    let source = CancellingSource {
        inner: InMemoryRegistry::with_records(records(&[1, 2, 3], "alice")),
        token: token.clone(),
    };
    let destination = InMemoryRegistry::new();
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = paced_config(2);
    let ctx = StageContext::new(&clock, &events, &config);

    let report = BatchExecutor::new(&source, &destination, ctx)
        .with_cancellation(token)
        .execute(&ids(&[1, 2, 3]));

    assert!(report.cancelled);
    assert_eq!(report.written, 2);
    assert_eq!(destination.write_log().len(), 1);
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(200)]);
    assert_eq!(events.names().last().copied(), Some("run_cancelled"));
}
