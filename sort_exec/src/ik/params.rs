//! Inverse kinematics parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::kin::{JointConfig, NUM_JOINTS};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Convergence tolerances shared by both solvers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IkTolerance {
    /// Units: millimetres
    pub pos_mm: f64,

    /// Units: degrees
    pub orient_deg: f64,
}

/// Parameters of the CCD solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcdParams {
    pub max_iterations: usize,

    pub tolerance: IkTolerance,

    /// Configuration every solve starts from.
    ///
    /// Units: degrees
    pub home_deg: JointConfig,

    // ---- STEP ANNEALING ----
    /// Position errors above which the coarse and medium steps are used.
    ///
    /// Units: millimetres
    pub coarse_above_mm: f64,
    pub medium_above_mm: f64,

    /// Units: degrees
    pub coarse_step_deg: f64,
    pub medium_step_deg: f64,
    pub fine_step_deg: f64,

    /// Upper bound on the boosted step.
    ///
    /// Units: degrees
    pub max_step_deg: f64,

    // ---- STAGNATION ESCAPE ----
    /// Consecutive joint probes without improvement before boosting.
    pub stagnation_limit: usize,

    /// Factor applied to the step on each boost.
    pub boost_factor: f64,
}

/// Parameters of the local refinement solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalParams {
    pub max_iterations: usize,

    pub tolerance: IkTolerance,

    /// Weight of the orientation error in the cost.
    pub orient_weight: f64,

    /// Weight of the squared departure from the seed, measured in radians.
    pub seed_weight: f64,

    /// Central difference probe.
    ///
    /// Units: degrees
    pub probe_deg: f64,

    /// Number of correction pairs kept by the quasi-Newton update.
    pub history: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for IkTolerance {
    fn default() -> Self {
        Self {
            pos_mm: 0.2,
            orient_deg: 0.3,
        }
    }
}

impl IkTolerance {
    pub fn is_met(&self, pos_err_mm: f64, orient_err_deg: f64) -> bool {
        pos_err_mm <= self.pos_mm && orient_err_deg <= self.orient_deg
    }
}

impl Default for CcdParams {
    fn default() -> Self {
        Self {
            max_iterations: 1200,
            tolerance: IkTolerance::default(),
            home_deg: [90.0; NUM_JOINTS],
            coarse_above_mm: 10.0,
            medium_above_mm: 3.0,
            coarse_step_deg: 2.0,
            medium_step_deg: 0.8,
            fine_step_deg: 0.2,
            max_step_deg: 10.0,
            stagnation_limit: 50,
            boost_factor: 1.5,
        }
    }
}

impl Default for LocalParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: IkTolerance::default(),
            orient_weight: 2.0,
            seed_weight: 5.0,
            probe_deg: 0.01,
            history: 5,
        }
    }
}
