// crates/tile-migrate-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: Migration Orchestrator
// Description: Sequences planning, batch execution, and verification.
// Purpose: Drive one run to a terminal state and decide finalize eligibility.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The orchestrator owns both registries and walks the run state machine:
//!
//! `Idle -> Planning -> (NothingToMigrate | ExecutingBatches)`
//! `ExecutingBatches -> (Aborted | Verifying)`
//! `Verifying -> (VerificationFailed | Completed)`
//!
//! Every failure is converted into a terminal state plus a summary; `run`
//! itself never fails. Only [`MigrationState::Completed`] marks the
//! destination as eligible for the external finalize step.
//!
//! Security posture: a finalized destination is never planned against, and a
//! verification read failure aborts rather than reporting a verdict.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use crate::core::ErrorKind;
use crate::core::ExecutionReport;
use crate::core::MigrationEvent;
use crate::core::MigrationRunResult;
use crate::core::MigrationState;
use crate::core::PipelineConfig;
use crate::core::RunError;
use crate::core::TileId;
use crate::core::VerificationReport;
use crate::core::duration_millis;
use crate::interfaces::Clock;
use crate::interfaces::DestinationRegistry;
use crate::interfaces::MigrationEventSink;
use crate::interfaces::SourceRegistry;
use crate::runtime::cancel::CancellationToken;
use crate::runtime::clock::SystemClock;
use crate::runtime::context::ReadError;
use crate::runtime::context::StageContext;
use crate::runtime::events::NoopEventSink;
use crate::runtime::executor::BatchExecutor;
use crate::runtime::planner::Plan;
use crate::runtime::planner::Planner;
use crate::runtime::verifier::Verifier;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Error message for runs started against a finalized destination.
pub const FINALIZED_MESSAGE: &str = "finalization already complete";

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Migration orchestrator over owned registry adapters.
pub struct MigrationOrchestrator<S, D> {
    /// Source registry.
    source: S,
    /// Destination registry.
    destination: D,
    /// Operational parameters.
    config: PipelineConfig,
    /// Clock used for pacing and timing.
    clock: Arc<dyn Clock + Send + Sync>,
    /// Progress event sink.
    events: Arc<dyn MigrationEventSink>,
    /// Cancellation flag checked between batches.
    cancel: CancellationToken,
}

impl<S, D> MigrationOrchestrator<S, D>
where
    S: SourceRegistry,
    D: DestinationRegistry,
{
    /// Creates an orchestrator with the system clock and no event output.
    #[must_use]
    pub fn new(source: S, destination: D, config: PipelineConfig) -> Self {
        Self {
            source,
            destination,
            config,
            clock: Arc::new(SystemClock::new()),
            events: Arc::new(NoopEventSink),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn MigrationEventSink>) -> Self {
        self.events = events;
        self
    }

    /// Replaces the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns a handle to the cancellation token.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns the source registry.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Returns the destination registry.
    #[must_use]
    pub const fn destination(&self) -> &D {
        &self.destination
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns a stage context bound to this orchestrator.
    #[must_use]
    pub fn context(&self) -> StageContext<'_> {
        StageContext::new(self.clock.as_ref(), self.events.as_ref(), &self.config)
    }

    /// Computes the pending plan without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] when any registry read fails after retries.
    pub fn plan(&self) -> Result<Plan, ReadError> {
        Planner::new(&self.source, &self.destination, self.context()).plan()
    }

    /// Runs verification alone, outside the state machine.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] when any registry read fails after retries.
    pub fn verify(&self) -> Result<VerificationReport, ReadError> {
        Verifier::new(&self.source, &self.destination, self.context()).verify()
    }

    /// Executes one migration run to a terminal state.
    #[must_use]
    pub fn run(&self) -> MigrationRunResult {
        let ctx = self.context();
        let mut run = RunTracker::new(self.clock.elapsed());
        ctx.events.record(&MigrationEvent::RunStarted {
            batch_size: self.config.batch_size,
            max_attempts: self.config.retry.attempts(),
        });

        match ctx.read("destination_is_finalized", None, || self.destination.is_finalized()) {
            Ok(finalized) if finalized.value => {
                ctx.events.record(&MigrationEvent::RunAbortedFinalized);
                run.error = Some(RunError {
                    stage: MigrationState::Idle,
                    kind: ErrorKind::Finalized,
                    message: FINALIZED_MESSAGE.to_string(),
                });
                run.summary = format!("aborted: {FINALIZED_MESSAGE}");
                return self.finish(run, MigrationState::Aborted);
            }
            Ok(_) => {}
            Err(error) => {
                run.fail(MigrationState::Idle, &error);
                return self.finish(run, MigrationState::Aborted);
            }
        }

        run.enter(MigrationState::Planning);
        let plan = match Planner::new(&self.source, &self.destination, ctx).plan() {
            Ok(plan) => plan,
            Err(error) => {
                run.fail(MigrationState::Planning, &error);
                return self.finish(run, MigrationState::Aborted);
            }
        };
        if plan.is_empty() {
            run.summary = format!(
                "nothing to migrate: all {} source records present in destination",
                plan.source_ids
            );
            return self.finish(run, MigrationState::NothingToMigrate);
        }
        run.pending = plan.pending;

        run.enter(MigrationState::ExecutingBatches);
        let execution = BatchExecutor::new(&self.source, &self.destination, ctx)
            .with_cancellation(self.cancel.clone())
            .execute(&run.pending);
        if !execution.is_complete() {
            run.error = Some(execution_error(&execution));
            run.summary = abort_summary(&execution);
            run.execution = Some(execution);
            return self.finish(run, MigrationState::Aborted);
        }
        let written = execution.written;
        run.execution = Some(execution);

        run.enter(MigrationState::Verifying);
        let report = match Verifier::new(&self.source, &self.destination, ctx).verify() {
            Ok(report) => report,
            Err(error) => {
                run.fail(MigrationState::Verifying, &error);
                return self.finish(run, MigrationState::Aborted);
            }
        };
        let state = if report.success {
            run.summary = format!(
                "completed: {written} records written; {} source and {} destination records \
                 verified",
                report.source_count, report.destination_count
            );
            MigrationState::Completed
        } else {
            run.summary = format!(
                "verification failed: {} missing, {} mismatched, counts {} vs {}",
                report.missing.len(),
                report.mismatches.len(),
                report.source_count,
                report.destination_count
            );
            MigrationState::VerificationFailed
        };
        run.verification = Some(report);
        self.finish(run, state)
    }

    /// Moves the run to its terminal state and emits the final event.
    fn finish(&self, mut run: RunTracker, state: MigrationState) -> MigrationRunResult {
        run.enter(state);
        let elapsed_ms = duration_millis(self.clock.elapsed().saturating_sub(run.started));
        self.events.record(&MigrationEvent::RunFinished {
            state,
            elapsed_ms,
        });
        MigrationRunResult {
            state,
            transitions: run.transitions,
            pending: run.pending,
            execution: run.execution,
            verification: run.verification,
            error: run.error,
            summary: run.summary,
            elapsed_ms,
            finalization_eligible: state == MigrationState::Completed,
        }
    }
}

// ============================================================================
// SECTION: Run Tracking
// ============================================================================

/// Mutable progress accumulated while a run advances.
struct RunTracker {
    /// Clock reading at run start.
    started: Duration,
    /// Visited states.
    transitions: Vec<MigrationState>,
    /// Pending keys from the planner.
    pending: Vec<TileId>,
    /// Execution report, once batches were attempted.
    execution: Option<ExecutionReport>,
    /// Verification report, once verification finished.
    verification: Option<VerificationReport>,
    /// Failure that ended the run.
    error: Option<RunError>,
    /// One-line outcome summary.
    summary: String,
}

impl RunTracker {
    /// Starts tracking in the `Idle` state.
    fn new(started: Duration) -> Self {
        Self {
            started,
            transitions: vec![MigrationState::Idle],
            pending: Vec::new(),
            execution: None,
            verification: None,
            error: None,
            summary: String::new(),
        }
    }

    /// Records a state transition.
    fn enter(&mut self, state: MigrationState) {
        self.transitions.push(state);
    }

    /// Records a read failure raised while in `stage`.
    fn fail(&mut self, stage: MigrationState, error: &ReadError) {
        self.summary = format!("aborted during {stage}: {error}");
        self.error = Some(RunError {
            stage,
            kind: error.kind(),
            message: error.to_string(),
        });
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the run error for an incomplete execution.
fn execution_error(execution: &ExecutionReport) -> RunError {
    if let Some(failure) = execution.failure() {
        return RunError {
            stage: MigrationState::ExecutingBatches,
            kind: failure.kind,
            message: failure.message.clone(),
        };
    }
    RunError {
        stage: MigrationState::ExecutingBatches,
        kind: ErrorKind::Cancelled,
        message: format!(
            "cancelled after {} of {} batches",
            execution.succeeded_batches, execution.planned_batches
        ),
    }
}

/// Builds the partial-progress summary for an aborted execution.
fn abort_summary(execution: &ExecutionReport) -> String {
    let progress = format!(
        "{} of {} batches succeeded ({} of {} records written)",
        execution.succeeded_batches,
        execution.planned_batches,
        execution.written,
        execution.requested
    );
    match execution.failed_batch {
        Some(index) => format!("aborted at batch {index}: {progress}; re-run to resume"),
        None => format!("cancelled: {progress}; re-run to resume"),
    }
}
