// crates/tile-migrate-core/src/runtime/clock.rs
// ============================================================================
// Module: Clocks and Pacing
// Description: System and manual clocks plus a fixed-delay pacer.
// Purpose: Express rate-limit pauses as a testable abstraction.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! Remote registries enforce request-rate ceilings, so every run inserts
//! fixed pauses between per-id calls and between batches. [`Pacer`] owns that
//! rule: the first tick after construction or [`Pacer::reset`] is free and
//! every later tick sleeps exactly the configured delay. [`ManualClock`]
//! records requested sleeps instead of blocking, which lets tests assert the
//! pacing schedule directly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use crate::interfaces::Clock;

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// Monotonic clock backed by [`Instant`] and [`thread::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    /// Origin used for elapsed-time readings.
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

// ============================================================================
// SECTION: Manual Clock
// ============================================================================

/// Virtual time state shared by clones of a [`ManualClock`].
#[derive(Debug, Default)]
struct ManualClockState {
    /// Current virtual time.
    now: Duration,
    /// Every sleep requested, in order.
    sleeps: Vec<Duration>,
}

/// Virtual clock that advances on sleep instead of blocking.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    /// Shared virtual time state.
    state: Arc<Mutex<ManualClockState>>,
}

impl ManualClock {
    /// Creates a manual clock at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances virtual time without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.now = state.now.saturating_add(duration);
        }
    }

    /// Returns every sleep requested so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().map(|state| state.sleeps.clone()).unwrap_or_default()
    }

    /// Returns the sum of all requested sleeps.
    #[must_use]
    pub fn total_slept(&self) -> Duration {
        self.sleeps().into_iter().fold(Duration::ZERO, Duration::saturating_add)
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.state.lock().map(|state| state.now).unwrap_or_default()
    }

    fn sleep(&self, duration: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.now = state.now.saturating_add(duration);
            state.sleeps.push(duration);
        }
    }
}

// ============================================================================
// SECTION: Pacer
// ============================================================================

/// Fixed-delay ticker placed between successive remote calls.
///
/// # Invariants
/// - The first [`Pacer::tick`] after construction or reset never sleeps.
/// - A zero delay never calls [`Clock::sleep`].
#[derive(Debug)]
pub struct Pacer<C: Clock> {
    /// Clock used to sleep.
    clock: C,
    /// Pause inserted before every tick except the first.
    delay: Duration,
    /// Whether the first tick has happened.
    primed: bool,
}

impl<C: Clock> Pacer<C> {
    /// Creates a pacer with the given delay.
    pub const fn new(clock: C, delay: Duration) -> Self {
        Self {
            clock,
            delay,
            primed: false,
        }
    }

    /// Waits out the pacing delay if this is not the first tick.
    ///
    /// Returns the duration slept.
    pub fn tick(&mut self) -> Duration {
        if !self.primed {
            self.primed = true;
            return Duration::ZERO;
        }
        if self.delay.is_zero() {
            return Duration::ZERO;
        }
        self.clock.sleep(self.delay);
        self.delay
    }

    /// Makes the next tick free again.
    pub const fn reset(&mut self) {
        self.primed = false;
    }

    /// Returns the configured delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}
