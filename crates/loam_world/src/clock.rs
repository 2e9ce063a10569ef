//! Time sources for the work budgets.
//!
//! The scheduler never reads the system clock directly. Tests drive it with
//! a [`ManualClock`] so budget cutoffs are deterministic.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;
#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Monotonic time source.
pub trait Clock: Send {
    /// Time elapsed since an arbitrary fixed epoch.
    fn now(&self) -> Duration;
}

/// Wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Starts a clock at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    step: Duration,
}

/// Hand-driven clock. Clones share the same time.
///
/// With a non-zero step, every `now()` read advances time by that step,
/// which makes "work until the budget runs out" loops terminate after a
/// known number of reads.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    /// Creates a stopped clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock that advances by `step` on every read.
    #[must_use]
    pub fn stepping(step: Duration) -> Self {
        let clock = Self::new();
        clock.set_step(step);
        clock
    }

    /// Moves time forward.
    pub fn advance(&self, by: Duration) {
        self.state.lock().now += by;
    }

    /// Changes the per-read step.
    pub fn set_step(&self, step: Duration) {
        self.state.lock().step = step;
    }

    /// Current time without stepping.
    #[must_use]
    pub fn peek(&self) -> Duration {
        self.state.lock().now
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let mut state = self.state.lock();
        let now = state.now;
        let step = state.step;
        state.now = now + step;
        now
    }
}
