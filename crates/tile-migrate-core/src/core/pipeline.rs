// crates/tile-migrate-core/src/core/pipeline.rs
// ============================================================================
// Module: Pipeline Settings
// Description: Tunable pacing, retry, and batching parameters.
// Purpose: Keep every operational constant overridable by the host.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`PipelineConfig`] carries every knob the planner, executor, and verifier
//! consult. Defaults reproduce the reference operating point: batches of 25,
//! three fetch attempts two seconds apart, 200ms between fetches, and five
//! seconds between batches.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default number of records per destination write.
pub const DEFAULT_BATCH_SIZE: usize = 25;
/// Default number of attempts per read.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay between read attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
/// Default delay between successive per-id calls.
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_millis(200);
/// Default delay between successive batches.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(5);

// ============================================================================
// SECTION: Retry Policy
// ============================================================================

/// Bounded fixed-delay retry policy for registry reads.
///
/// # Invariants
/// - `max_attempts` counts the first call; values below one behave as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Returns the effective attempt bound (at least one).
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 { 1 } else { self.max_attempts }
    }
}

// ============================================================================
// SECTION: Planner Strategy
// ============================================================================

/// How the planner learns which keys already exist in the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStrategy {
    /// One paced `exists` call per source key.
    #[default]
    PerId,
    /// A single bulk listing of destination keys.
    Bulk,
}

// ============================================================================
// SECTION: Pipeline Config
// ============================================================================

/// Operational parameters for one migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum records per destination write.
    pub batch_size: usize,
    /// Retry policy for registry reads.
    pub retry: RetryPolicy,
    /// Pause between successive per-id registry calls.
    pub item_delay: Duration,
    /// Pause between successive batches.
    pub batch_delay: Duration,
    /// Destination existence strategy used by the planner.
    pub plan_strategy: PlanStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
            item_delay: DEFAULT_ITEM_DELAY,
            batch_delay: DEFAULT_BATCH_DELAY,
            plan_strategy: PlanStrategy::default(),
        }
    }
}

impl PipelineConfig {
    /// Returns a config with every delay set to zero.
    ///
    /// Intended for tests and local replays where pacing is irrelevant.
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        self.retry.delay = Duration::ZERO;
        self.item_delay = Duration::ZERO;
        self.batch_delay = Duration::ZERO;
        self
    }
}
