// crates/tile-migrate-core/src/runtime/context.rs
// ============================================================================
// Module: Stage Context
// Description: Shared clock, event sink, and settings for pipeline stages.
// Purpose: Give every stage the same retrying, event-reporting read path.
// Dependencies: crate::{core, interfaces, runtime::retry}, thiserror
// ============================================================================

//! ## Overview
//! [`StageContext`] bundles what every stage needs besides the registries.
//! Its [`StageContext::read`] helper is the only way stages perform registry
//! reads: it applies the retry policy and emits a `fetch_retry` event for
//! every retried attempt.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ErrorKind;
use crate::core::FailureDetail;
use crate::core::MigrationEvent;
use crate::core::PipelineConfig;
use crate::core::TileId;
use crate::interfaces::Clock;
use crate::interfaces::MigrationEventSink;
use crate::interfaces::RegistryError;
use crate::runtime::clock::Pacer;
use crate::runtime::retry::Retried;
use crate::runtime::retry::retry_read;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry read that failed after the retry policy was applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed after {attempts} attempt(s): {error}")]
pub struct ReadError {
    /// Operation label.
    pub operation: &'static str,
    /// Key involved, when the read is per-key.
    pub id: Option<TileId>,
    /// Attempts made.
    pub attempts: u32,
    /// Last error observed.
    pub error: RegistryError,
}

impl ReadError {
    /// Returns the failure classification.
    ///
    /// A transient error that reaches the caller has used every attempt and
    /// is promoted to [`ErrorKind::RetriesExhausted`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self.error {
            RegistryError::Transient(_) => ErrorKind::RetriesExhausted,
            _ => self.error.kind(),
        }
    }

    /// Converts the error into a report detail.
    #[must_use]
    pub fn detail(&self) -> FailureDetail {
        FailureDetail {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Clock, event sink, and settings shared by pipeline stages.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    /// Clock used for pacing, retry delays, and timing.
    pub clock: &'a dyn Clock,
    /// Progress event sink.
    pub events: &'a dyn MigrationEventSink,
    /// Operational parameters.
    pub config: &'a PipelineConfig,
}

impl<'a> StageContext<'a> {
    /// Creates a stage context.
    #[must_use]
    pub const fn new(
        clock: &'a dyn Clock,
        events: &'a dyn MigrationEventSink,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            clock,
            events,
            config,
        }
    }

    /// Returns a pacer for per-id calls.
    #[must_use]
    pub const fn item_pacer(&self) -> Pacer<&'a dyn Clock> {
        Pacer::new(self.clock, self.config.item_delay)
    }

    /// Returns a pacer for batch boundaries.
    #[must_use]
    pub const fn batch_pacer(&self) -> Pacer<&'a dyn Clock> {
        Pacer::new(self.clock, self.config.batch_delay)
    }

    /// Performs a registry read under the configured retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] when the read fails permanently or exhausts its
    /// attempts.
    pub fn read<T, F>(
        &self,
        operation: &'static str,
        id: Option<TileId>,
        read: F,
    ) -> Result<Retried<T>, ReadError>
    where
        F: FnMut() -> Result<T, RegistryError>,
    {
        let policy = self.config.retry;
        let max_attempts = policy.attempts();
        retry_read(policy, self.clock, read, |attempt, error| {
            self.events.record(&MigrationEvent::FetchRetry {
                operation: operation.to_string(),
                id,
                attempt,
                max_attempts,
                error: error.to_string(),
            });
        })
        .map_err(|failure| ReadError {
            operation,
            id,
            attempts: failure.attempts,
            error: failure.error,
        })
    }
}
