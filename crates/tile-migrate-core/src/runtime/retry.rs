// crates/tile-migrate-core/src/runtime/retry.rs
// ============================================================================
// Module: Read Retry
// Description: Bounded fixed-delay retry for registry reads.
// Purpose: Absorb transient provider faults without masking real failures.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`retry_read`] runs a read until it succeeds, fails with a non-transient
//! error, or exhausts the [`RetryPolicy`]. Only
//! [`RegistryError::Transient`] is retried. Writes never go through this
//! path because destination writes are not idempotent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::RetryPolicy;
use crate::interfaces::Clock;
use crate::interfaces::RegistryError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Successful read with the number of attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    /// Value returned by the read.
    pub value: T,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

/// Read that failed permanently or exhausted its attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure {
    /// Last error observed.
    pub error: RegistryError,
    /// Attempts made.
    pub attempts: u32,
}

// ============================================================================
// SECTION: Retry
// ============================================================================

/// Runs `read` under `policy`, sleeping on `clock` between attempts.
///
/// `on_retry` is called with the failed attempt number and its error before
/// each retry delay.
///
/// # Errors
///
/// Returns [`RetryFailure`] carrying the last error when the read fails with
/// a non-transient error or exhausts the policy.
pub fn retry_read<T, C, F, R>(
    policy: RetryPolicy,
    clock: &C,
    mut read: F,
    mut on_retry: R,
) -> Result<Retried<T>, RetryFailure>
where
    C: Clock + ?Sized,
    F: FnMut() -> Result<T, RegistryError>,
    R: FnMut(u32, &RegistryError),
{
    let max_attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match read() {
            Ok(value) => {
                return Ok(Retried {
                    value,
                    attempts: attempt,
                });
            }
            Err(error) if error.is_retryable() && attempt < max_attempts => {
                on_retry(attempt, &error);
                if !policy.delay.is_zero() {
                    clock.sleep(policy.delay);
                }
                attempt += 1;
            }
            Err(error) => {
                return Err(RetryFailure {
                    error,
                    attempts: attempt,
                });
            }
        }
    }
}
