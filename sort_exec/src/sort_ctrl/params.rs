//! Parameters structure for SortCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::SortCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for sorting control.
#[derive(Debug, Clone, Deserialize)]
pub struct SortCtrlParams {

    // ---- DETECTION ----

    /// Number of consecutive identical labels needed before an object is
    /// acted on.
    pub consistency_threshold: u32,

    /// Log the running count of empty frames every this many empty frames.
    pub empty_log_interval: u64,

    /// Delay between frames while waiting for an object.
    ///
    /// Units: seconds
    pub poll_period_s: f64,

    // ---- PICK CYCLE ----

    /// Minimum time to wait after each movement step, whatever the estimate.
    ///
    /// Units: seconds
    pub min_step_sleep_s: f64,

    /// Time frames are drained for after the belt is restarted.
    ///
    /// Units: seconds
    pub clearing_period_s: f64,

    /// Number of frames sampled to check the pick area is empty.
    pub verify_samples: u32,

    /// Delay between verification samples.
    ///
    /// Units: seconds
    pub verify_interval_s: f64,

    /// Pause at the end of each pick cycle.
    ///
    /// Units: seconds
    pub post_cycle_pause_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SortCtrlParams {
    fn default() -> Self {
        Self {
            consistency_threshold: 3,
            empty_log_interval: 30,
            poll_period_s: 0.1,
            min_step_sleep_s: 0.1,
            clearing_period_s: 2.0,
            verify_samples: 5,
            verify_interval_s: 0.2,
            post_cycle_pause_s: 1.0,
        }
    }
}

impl SortCtrlParams {
    pub fn validate(&self) -> Result<(), SortCtrlError> {
        if self.consistency_threshold == 0 {
            return Err(SortCtrlError::InvalidParams(
                "consistency_threshold must be at least 1".into(),
            ));
        }

        if self.empty_log_interval == 0 {
            return Err(SortCtrlError::InvalidParams(
                "empty_log_interval must be at least 1".into(),
            ));
        }

        let times = [
            ("poll_period_s", self.poll_period_s),
            ("min_step_sleep_s", self.min_step_sleep_s),
            ("clearing_period_s", self.clearing_period_s),
            ("verify_interval_s", self.verify_interval_s),
            ("post_cycle_pause_s", self.post_cycle_pause_s),
        ];

        for (name, value) in times.iter() {
            if !(value.is_finite() && *value >= 0.0) {
                return Err(SortCtrlError::InvalidParams(format!(
                    "{} must be a non-negative number of seconds, found {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}
