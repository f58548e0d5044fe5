//! Time source used to pace the control loop
//!
//! The loop only ever sleeps and reads elapsed time through a [`Clock`], so a
//! replay can run against [`SimClock`] without waiting in real time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Mutex;
use std::time::Instant;

use util::time::seconds_to_std;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

pub trait Clock: Send + Sync {
    /// Seconds elapsed since the clock was created.
    fn now_s(&self) -> f64;

    /// Block for the given number of seconds.
    fn sleep_s(&self, seconds: f64);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Wall clock.
#[derive(Debug)]
pub struct SystemClock {
    start: Instant,
}

/// Simulated clock, sleeping advances time instantly.
#[derive(Debug, Default)]
pub struct SimClock {
    now_s: Mutex<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn sleep_s(&self, seconds: f64) {
        std::thread::sleep(seconds_to_std(seconds))
    }
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SimClock {
    fn now_s(&self) -> f64 {
        match self.now_s.lock() {
            Ok(t) => *t,
            Err(e) => *e.into_inner(),
        }
    }

    fn sleep_s(&self, seconds: f64) {
        if !(seconds > 0.0) {
            return;
        }

        match self.now_s.lock() {
            Ok(mut t) => *t += seconds,
            Err(e) => *e.into_inner() += seconds,
        }
    }
}
