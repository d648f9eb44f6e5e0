//! Unscaled time sources.
//!
//! Cooldowns are measured against a clock that ignores any slow-motion or
//! pause scaling the host applies to gameplay time.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

/// Source of unscaled time in seconds.
pub trait Clock {
    /// Seconds since an arbitrary fixed origin.
    fn now(&self) -> f64;
}

/// Monotonic wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock starting at zero now.
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
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Arc<Mutex<f64>>,
}

impl ManualClock {
    /// Create a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to an absolute time.
    pub fn set(&self, seconds: f64) {
        *self.time.lock() = seconds;
    }

    /// Move time forward.
    pub fn advance(&self, seconds: f64) {
        *self.time.lock() += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.time.lock()
    }
}
