// crates/tile-migrate-core/src/runtime/cancel.rs
// ============================================================================
// Module: Cancellation
// Description: Shared cancellation flag checked at batch boundaries.
// Purpose: Let hosts stop a run without leaving a batch half-assembled.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A [`CancellationToken`] is a shared flag. The executor only consults it
//! between batches, never between per-id fetches.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

// ============================================================================
// SECTION: Token
// ============================================================================

/// Clonable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// Shared flag.
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
