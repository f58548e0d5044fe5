//! # Inverse kinematics module
//!
//! Two interchangeable strategies map a target [`Pose`] back to joint angles:
//!
//! - [`CcdSolver`] searches from the home configuration one joint at a time.
//!   It needs no initial guess and always returns its best configuration.
//! - [`LocalSolver`] refines a known seed configuration, penalising departures
//!   from the seed so consecutive waypoints stay continuous.
//!
//! [`solve_pose`] combines the two for targets with no known seed. CCD runs
//! first and, if it stalls, the local solver refines from the CCD result and
//! from closed form seeds of the arm geometry.
//!
//! Neither solver raises on unreachable targets. Callers branch on
//! [`IkSolution::converged`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod ccd;
mod local;
mod params;
mod seed;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use serde::{Deserialize, Serialize};

use crate::kin::{JointConfig, KinChain, Pose};

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use ccd::{CcdResult, CcdSolver};
pub use local::LocalSolver;
pub use params::{CcdParams, IkTolerance, LocalParams};
pub use seed::geometric_seeds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Result of an inverse kinematics solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IkSolution {
    /// Best configuration found, always within the joint range.
    pub joints: JointConfig,

    /// True if both the position and orientation tolerances are met.
    pub converged: bool,

    /// Number of iterations performed.
    pub iterations: usize,

    /// Position error of `joints`.
    ///
    /// Units: millimetres
    pub pos_err_mm: f64,

    /// Orientation error of `joints`.
    ///
    /// Units: degrees
    pub orient_err_deg: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A strategy for solving inverse kinematics.
pub trait IkStrategy {
    /// Solve for `target`. Strategies that need a starting point use `seed`,
    /// others ignore it.
    fn solve(&self, chain: &KinChain, target: &Pose, seed: &JointConfig) -> IkSolution;
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Position and orientation error of a configuration against a target.
pub fn pose_errors(chain: &KinChain, joints: &JointConfig, target: &Pose) -> (f64, f64) {
    let pose = chain.compute_pose(joints);
    (pose.position_error(target), pose.orientation_error(target))
}

/// Solve from scratch with CCD, then refine locally if CCD did not converge.
///
/// Refinement starts from the CCD result, then from each geometric seed, and
/// stops at the first converged solution. Otherwise the solution with the
/// lowest combined error is returned. Iterations of every stage are summed.
pub fn solve_pose(
    chain: &KinChain,
    target: &Pose,
    ccd: &CcdSolver,
    local: &LocalSolver,
) -> IkSolution {
    let global = ccd.solve_ccd(chain, target).into_solution(chain, target);

    if global.converged {
        return global;
    }

    debug!(
        "CCD stopped at {:.3} mm / {:.3} deg, refining",
        global.pos_err_mm, global.orient_err_deg
    );

    let total = |s: &IkSolution| s.pos_err_mm + s.orient_err_deg;

    let mut best = global;
    let mut iterations = global.iterations;

    let seeds = std::iter::once(global.joints).chain(geometric_seeds(chain, target));

    for seed in seeds {
        let refined = local.solve_local(chain, target, &seed);
        iterations += refined.iterations;

        debug!(
            "Local refinement from {:?} reached {:.3} mm / {:.3} deg",
            seed, refined.pos_err_mm, refined.orient_err_deg
        );

        if refined.converged || total(&refined) <= total(&best) {
            best = refined;
        }

        if best.converged {
            break;
        }
    }

    IkSolution { iterations, ..best }
}
