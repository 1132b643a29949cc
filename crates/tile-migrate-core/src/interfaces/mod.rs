// crates/tile-migrate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Tile Migrate Interfaces
// Description: Backend-agnostic ports for registries, clocks, and progress events.
// Purpose: Define the contract surfaces used by the migration runtime.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the migration pipeline integrates with the source
//! and destination registries without embedding transport details. The
//! planner, executor, and verifier only ever see these traits, so every
//! stage can run against in-memory fakes.
//!
//! Registry errors are classified up front: callers branch on
//! [`RegistryError::is_retryable`] instead of inspecting messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::time::Duration;

use thiserror::Error;

use crate::core::ErrorKind;
use crate::core::MigrationEvent;
use crate::core::Record;
use crate::core::TileId;

// ============================================================================
// SECTION: Registry Errors
// ============================================================================

/// Registry access errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Network or provider hiccup; safe to retry reads.
    #[error("transient registry error: {0}")]
    Transient(String),
    /// Key absent where presence was assumed.
    #[error("record not found: {0}")]
    NotFound(TileId),
    /// Destination is finalized; migration writes are permanently disabled.
    #[error("destination registry is finalized")]
    Finalized,
    /// Request rejected or malformed; never retried.
    #[error("registry request rejected: {0}")]
    Fatal(String),
}

impl RegistryError {
    /// Returns true when the failed operation may be attempted again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Returns the error classification label.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transient(_) => ErrorKind::Transient,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Finalized => ErrorKind::Finalized,
            Self::Fatal(_) => ErrorKind::Fatal,
        }
    }
}

// ============================================================================
// SECTION: Source Registry
// ============================================================================

/// Read-only client over the deprecated registry.
///
/// Implementations must not mutate registry state.
pub trait SourceRegistry {
    /// Enumerates every record key in registry order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the listing cannot be fetched.
    fn list_all_ids(&self) -> Result<Vec<TileId>, RegistryError>;

    /// Fetches one record by key.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the key does not exist and
    /// [`RegistryError::Transient`] on network or provider faults.
    fn get_record(&self, id: TileId) -> Result<Record, RegistryError>;

    /// Returns the number of records held by the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the count cannot be fetched.
    fn total_count(&self) -> Result<u64, RegistryError>;
}

// ============================================================================
// SECTION: Destination Registry
// ============================================================================

/// Client over the replacement registry.
pub trait DestinationRegistry {
    /// Returns the set of keys already present.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the listing cannot be fetched.
    fn list_existing_ids(&self) -> Result<BTreeSet<TileId>, RegistryError>;

    /// Returns true when the key is present.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the check cannot be performed.
    fn exists(&self, id: TileId) -> Result<bool, RegistryError>;

    /// Fetches one record by key.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the key does not exist.
    fn get_record(&self, id: TileId) -> Result<Record, RegistryError>;

    /// Writes a batch of records in a single all-or-nothing call.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Finalized`] when the finalize flag is set and
    /// [`RegistryError::Fatal`] when the batch is rejected. No record of a
    /// rejected batch is persisted.
    fn write_batch(&self, records: &[Record]) -> Result<(), RegistryError>;

    /// Returns the finalize flag.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the flag cannot be read.
    fn is_finalized(&self) -> Result<bool, RegistryError>;

    /// Returns the number of records held by the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the count cannot be fetched.
    fn total_count(&self) -> Result<u64, RegistryError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Time source used for pacing, retry delays, and elapsed-time reporting.
pub trait Clock {
    /// Returns monotonic time elapsed since the clock's origin.
    fn elapsed(&self) -> Duration;

    /// Suspends the caller for the given duration.
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn elapsed(&self) -> Duration {
        (**self).elapsed()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

// ============================================================================
// SECTION: Event Sink
// ============================================================================

/// Sink for structured migration progress events.
pub trait MigrationEventSink: Send + Sync {
    /// Records a progress event.
    fn record(&self, event: &MigrationEvent);
}
