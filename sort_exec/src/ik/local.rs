//! Local refinement solver
//!
//! Minimises
//!
//! ```text
//! cost(q) = pos_err + w_o * orient_err + w_s * |rad(q - seed)|^2
//! ```
//!
//! with a projected limited-memory BFGS descent. Gradients are taken by
//! central differences and every trial point is clamped into the joint range.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::Vector5;
use std::collections::VecDeque;

use super::{pose_errors, IkSolution, IkStrategy, LocalParams};
use crate::kin::{clamp_config, clamp_joint, JointConfig, KinChain, Pose, NUM_JOINTS};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Sufficient decrease constant of the Armijo condition.
const ARMIJO_C: f64 = 1e-4;

/// Line search gives up once the step shrinks below this.
const MIN_LINE_STEP: f64 = 1e-10;

/// Correction pairs with less curvature than this are discarded.
const MIN_CURVATURE: f64 = 1e-12;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Seeded local IK solver.
#[derive(Debug, Clone, Default)]
pub struct LocalSolver {
    pub params: LocalParams,
}

/// Cost function bound to one target and seed.
struct Cost<'a> {
    chain: &'a KinChain,
    target: &'a Pose,
    seed: &'a JointConfig,
    params: &'a LocalParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> Cost<'a> {
    fn eval(&self, q: &Vector5<f64>) -> f64 {
        let joints: JointConfig = (*q).into();
        let (pe, oe) = pose_errors(self.chain, &joints, self.target);

        let departure: f64 = joints
            .iter()
            .zip(self.seed.iter())
            .map(|(a, s)| (a - s).to_radians().powi(2))
            .sum();

        pe + self.params.orient_weight * oe + self.params.seed_weight * departure
    }

    /// Central difference gradient, one-sided at the joint limits.
    fn gradient(&self, q: &Vector5<f64>) -> Vector5<f64> {
        let h = self.params.probe_deg;
        let mut g = Vector5::zeros();

        for i in 0..NUM_JOINTS {
            let mut up = *q;
            let mut dn = *q;
            up[i] = clamp_joint(q[i] + h);
            dn[i] = clamp_joint(q[i] - h);

            if up[i] != dn[i] {
                g[i] = (self.eval(&up) - self.eval(&dn)) / (up[i] - dn[i]);
            }
        }

        g
    }
}

impl LocalSolver {
    pub fn new(params: LocalParams) -> Self {
        Self { params }
    }

    /// Refine `seed` towards `target`.
    ///
    /// The returned solution's `converged` flag must be checked, an
    /// unreachable target yields the best configuration found with
    /// `converged = false`.
    pub fn solve_local(&self, chain: &KinChain, target: &Pose, seed: &JointConfig) -> IkSolution {
        let p = &self.params;
        let cost = Cost {
            chain,
            target,
            seed,
            params: p,
        };

        let mut q = Vector5::from(clamp_config(seed));
        let mut c = cost.eval(&q);
        let mut g = cost.gradient(&q);

        // Correction pairs (s, y), oldest first
        let mut history: VecDeque<(Vector5<f64>, Vector5<f64>)> = VecDeque::with_capacity(p.history + 1);

        let mut iterations = p.max_iterations;

        for iteration in 0..p.max_iterations {
            let joints: JointConfig = q.into();
            let (pe, oe) = pose_errors(chain, &joints, target);
            if p.tolerance.is_met(pe, oe) {
                iterations = iteration;
                break;
            }

            let mut d = -Self::two_loop(&history, &g);

            // Fall back to steepest descent if the curvature model is stale
            if d.dot(&g) >= 0.0 {
                d = -g;
                history.clear();
            }

            let (next_q, next_c) = match Self::line_search(&cost, &q, c, &g, &d) {
                Some(accepted) => accepted,
                None => {
                    trace!("Local IK line search stalled at iteration {}", iteration);
                    iterations = iteration;
                    break;
                }
            };

            let next_g = cost.gradient(&next_q);
            let s = next_q - q;
            let y = next_g - g;

            if s.dot(&y) > MIN_CURVATURE {
                history.push_back((s, y));
                if history.len() > p.history {
                    history.pop_front();
                }
            }

            q = next_q;
            c = next_c;
            g = next_g;
        }

        let joints: JointConfig = q.into();
        let (pos_err_mm, orient_err_deg) = pose_errors(chain, &joints, target);

        IkSolution {
            joints,
            converged: p.tolerance.is_met(pos_err_mm, orient_err_deg),
            iterations,
            pos_err_mm,
            orient_err_deg,
        }
    }

    /// Apply the inverse Hessian approximation to `g`.
    fn two_loop(history: &VecDeque<(Vector5<f64>, Vector5<f64>)>, g: &Vector5<f64>) -> Vector5<f64> {
        let mut r = *g;
        let mut alphas = Vec::with_capacity(history.len());

        for (s, y) in history.iter().rev() {
            let rho = 1.0 / y.dot(s);
            let alpha = rho * s.dot(&r);
            r -= y * alpha;
            alphas.push((alpha, rho));
        }

        let gamma = match history.back() {
            Some((s, y)) => s.dot(y) / y.dot(y),
            None => 0.1 / g.norm().max(1e-12),
        };
        r *= gamma;

        for ((s, y), (alpha, rho)) in history.iter().zip(alphas.iter().rev()) {
            let beta = rho * y.dot(&r);
            r += s * (alpha - beta);
        }

        r
    }

    /// Backtracking line search along `d`, projecting every trial point into
    /// the joint range. Returns `None` if no step decreases the cost.
    fn line_search(
        cost: &Cost,
        q: &Vector5<f64>,
        c: f64,
        g: &Vector5<f64>,
        d: &Vector5<f64>,
    ) -> Option<(Vector5<f64>, f64)> {
        let slope = g.dot(d);
        let mut step = 1.0;

        while step > MIN_LINE_STEP {
            let trial = (q + d * step).map(clamp_joint);
            let trial_c = cost.eval(&trial);

            if trial_c <= c + ARMIJO_C * step * slope && trial_c < c {
                return Some((trial, trial_c));
            }

            step *= 0.5;
        }

        None
    }
}

impl IkStrategy for LocalSolver {
    fn solve(&self, chain: &KinChain, target: &Pose, seed: &JointConfig) -> IkSolution {
        self.solve_local(chain, target, seed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kin::is_in_range;

    fn offset(q: &JointConfig, d: &JointConfig) -> JointConfig {
        let mut out = *q;
        for (a, b) in out.iter_mut().zip(d.iter()) {
            *a += b;
        }
        out
    }

    #[test]
    fn test_exact_seed() {
        let chain = KinChain::default();
        let solver = LocalSolver::default();
        let q = [80.0, 100.0, 70.0, 110.0, 95.0];

        let sol = solver.solve_local(&chain, &chain.compute_pose(&q), &q);

        assert!(sol.converged);
        assert_eq!(sol.iterations, 0);
        assert_eq!(sol.joints, q);
    }

    #[test]
    fn test_refines_nearby_seed() {
        let chain = KinChain::default();
        let solver = LocalSolver::default();

        let cases = [
            ([80.0, 100.0, 70.0, 110.0, 95.0], [1.5, -1.0, 1.0, -1.5, 0.5]),
            ([60.0, 120.0, 60.0, 100.0, 90.0], [2.0, 0.0, 0.0, 0.0, 0.0]),
            ([100.0, 80.0, 100.0, 80.0, 90.0], [0.0, 1.0, 0.0, 0.0, 0.0]),
            ([120.0, 70.0, 110.0, 60.0, 100.0], [0.5; NUM_JOINTS]),
        ];

        for (q, d) in cases.iter() {
            let target = chain.compute_pose(q);
            let sol = solver.solve_local(&chain, &target, &offset(q, d));

            assert!(
                sol.converged,
                "{:?} from seed offset {:?}: {} mm {} deg",
                q, d, sol.pos_err_mm, sol.orient_err_deg
            );
            assert!(sol.pos_err_mm <= 0.2 && sol.orient_err_deg <= 0.3);
            assert!(is_in_range(&sol.joints));
        }
    }

    #[test]
    fn test_unreachable_target() {
        let chain = KinChain::default();
        let solver = LocalSolver::default();
        let target = Pose::new(1000.0, 0.0, 0.0, 0.0, 0.0, 0.0);

        let sol = solver.solve_local(&chain, &target, &[90.0; NUM_JOINTS]);

        assert!(!sol.converged);
        assert!(is_in_range(&sol.joints));
    }

    #[test]
    fn test_seed_out_of_range_is_clamped() {
        let chain = KinChain::default();
        let solver = LocalSolver::default();
        let q = [0.0, 90.0, 90.0, 90.0, 180.0];

        let sol = solver.solve(&chain, &chain.compute_pose(&q), &[-5.0, 90.0, 90.0, 90.0, 185.0]);

        assert!(is_in_range(&sol.joints));
    }
}
