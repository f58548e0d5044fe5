//! Cyclic coordinate descent solver

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::{Deserialize, Serialize};

use super::{pose_errors, CcdParams, IkSolution, IkStrategy};
use crate::kin::{clamp_joint, JointConfig, KinChain, Pose, NUM_JOINTS};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Best-effort CCD solver.
#[derive(Debug, Clone, Default)]
pub struct CcdSolver {
    pub params: CcdParams,
}

/// Result of a CCD solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcdResult {
    pub joints: JointConfig,

    pub iterations: usize,

    pub converged: bool,

    /// Combined error (position + orientation) at the start and after every
    /// iteration.
    pub error_trace: Vec<f64>,
}

/// Snapshot of the search, replaced wholesale whenever a probe improves it.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    joints: JointConfig,
    pos_err_mm: f64,
    orient_err_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Candidate {
    fn evaluate(chain: &KinChain, joints: JointConfig, target: &Pose) -> Self {
        let (pos_err_mm, orient_err_deg) = pose_errors(chain, &joints, target);
        Self {
            joints,
            pos_err_mm,
            orient_err_deg,
        }
    }

    fn error(&self) -> f64 {
        self.pos_err_mm + self.orient_err_deg
    }
}

impl CcdSolver {
    pub fn new(params: CcdParams) -> Self {
        Self { params }
    }

    /// Solve for the target starting from the home configuration.
    ///
    /// Always returns a configuration. While the position tolerance has not
    /// yet been met joints are visited wrist first, once it has been met the
    /// order switches permanently to base first.
    pub fn solve_ccd(&self, chain: &KinChain, target: &Pose) -> CcdResult {
        let p = &self.params;

        let mut current = Candidate::evaluate(chain, p.home_deg, target);
        let mut error_trace = vec![current.error()];

        let mut position_reached = false;
        let mut stagnation = 0usize;
        let mut boost = 1.0;

        for iteration in 0..p.max_iterations {
            if p.tolerance.is_met(current.pos_err_mm, current.orient_err_deg) {
                trace!("CCD converged after {} iterations", iteration);
                return CcdResult {
                    joints: current.joints,
                    iterations: iteration,
                    converged: true,
                    error_trace,
                };
            }

            if !position_reached && current.pos_err_mm <= p.tolerance.pos_mm {
                trace!("CCD position reached at iteration {}, refining orientation", iteration);
                position_reached = true;
            }

            let step = (self.base_step(current.pos_err_mm) * boost).min(p.max_step_deg);

            let order: Vec<usize> = if position_reached {
                (0..NUM_JOINTS).collect()
            } else {
                (0..NUM_JOINTS).rev().collect()
            };

            for joint in order {
                match Self::probe_joint(chain, target, &current, joint, step) {
                    Some(better) => {
                        current = better;
                        stagnation = 0;
                        boost = 1.0;
                    }
                    None => {
                        stagnation += 1;
                        if stagnation >= p.stagnation_limit {
                            boost *= p.boost_factor;
                            stagnation = 0;
                            trace!("CCD stagnated, step boost now {:.3}", boost);
                        }
                    }
                }
            }

            error_trace.push(current.error());
        }

        CcdResult {
            joints: current.joints,
            iterations: p.max_iterations,
            converged: p.tolerance.is_met(current.pos_err_mm, current.orient_err_deg),
            error_trace,
        }
    }

    /// Coarse-to-fine step for the current position error.
    fn base_step(&self, pos_err_mm: f64) -> f64 {
        let p = &self.params;

        if pos_err_mm > p.coarse_above_mm {
            p.coarse_step_deg
        } else if pos_err_mm > p.medium_above_mm {
            p.medium_step_deg
        } else {
            p.fine_step_deg
        }
    }

    /// Probe `+step` and `-step` on one joint and return the better probe if
    /// it reduces the combined error.
    fn probe_joint(
        chain: &KinChain,
        target: &Pose,
        current: &Candidate,
        joint: usize,
        step: f64,
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;

        for delta in [step, -step].iter() {
            let mut joints = current.joints;
            joints[joint] = clamp_joint(joints[joint] + delta);

            // Probe pinned at the joint limit
            if joints[joint] == current.joints[joint] {
                continue;
            }

            let probe = Candidate::evaluate(chain, joints, target);

            if probe.error() < current.error()
                && best.map_or(true, |b| probe.error() < b.error())
            {
                best = Some(probe);
            }
        }

        best
    }
}

impl CcdResult {
    /// Convert into a generic solution, evaluating the final errors.
    pub fn into_solution(self, chain: &KinChain, target: &Pose) -> IkSolution {
        let (pos_err_mm, orient_err_deg) = pose_errors(chain, &self.joints, target);

        IkSolution {
            joints: self.joints,
            converged: self.converged,
            iterations: self.iterations,
            pos_err_mm,
            orient_err_deg,
        }
    }
}

impl IkStrategy for CcdSolver {
    fn solve(&self, chain: &KinChain, target: &Pose, _seed: &JointConfig) -> IkSolution {
        self.solve_ccd(chain, target).into_solution(chain, target)
    }
}
