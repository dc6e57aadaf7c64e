//! Monotonic frame clock.
//!
//! Uses `std::time::Instant` natively and `web_time::Instant` on wasm32,
//! where the std clock is unavailable.

use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Host timestamps relative to the moment the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    origin: Instant,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    #[must_use]
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }

    /// Time since the clock was created.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}
