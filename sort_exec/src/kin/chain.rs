//! Forward kinematics over the DH chain

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use super::{DhLink, JointConfig, Pose, NUM_JOINTS};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// DH table of the sorting arm, base link first.
pub const DEFAULT_DH_TABLE: [DhLink; NUM_JOINTS] = [
    DhLink::new(0.0, 86.65, 0.0, 90.0),
    DhLink::new(0.0, 0.0, 120.0, 0.0),
    DhLink::new(-90.0, 0.0, 115.48, 0.0),
    DhLink::new(0.0, 0.0, 0.0, 90.0),
    DhLink::new(-90.0, 161.74, 0.0, 0.0),
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The arm's kinematic chain.
///
/// Defined once at startup and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinChain {
    links: [DhLink; NUM_JOINTS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for KinChain {
    fn default() -> Self {
        Self::new(DEFAULT_DH_TABLE)
    }
}

impl KinChain {
    pub fn new(links: [DhLink; NUM_JOINTS]) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &[DhLink; NUM_JOINTS] {
        &self.links
    }

    /// Sum of the link lengths and offsets, an upper bound on the distance
    /// from the base origin to the effector.
    ///
    /// Units: millimetres
    pub fn max_reach_mm(&self) -> f64 {
        self.links.iter().map(|l| l.a_mm.abs() + l.d_mm.abs()).sum()
    }

    /// Base to effector transform for the given joint angles.
    pub fn compute_transform(&self, joints: &JointConfig) -> Matrix4<f64> {
        self.links
            .iter()
            .zip(joints.iter())
            .fold(Matrix4::identity(), |t, (link, q)| t * link.transform(*q))
    }

    /// Effector pose for the given joint angles.
    ///
    /// Always succeeds for finite input, range checking is the caller's
    /// responsibility.
    pub fn compute_pose(&self, joints: &JointConfig) -> Pose {
        Pose::from_transform(&self.compute_transform(joints))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn assert_pose_near(a: &Pose, b: &Pose, tol: f64) {
        assert!(
            a.position_error(b) < tol && a.orientation_error(b) < tol,
            "{} != {}",
            a,
            b
        );
    }

    #[test]
    fn test_home_points_up() {
        let chain = KinChain::default();
        let pose = chain.compute_pose(&[90.0; NUM_JOINTS]);

        assert_pose_near(&pose, &Pose::new(0.0, 0.0, 483.87, 0.0, 0.0, -90.0), 1e-9);
    }

    #[test]
    fn test_base_rotation_changes_yaw() {
        let chain = KinChain::default();
        let pose = chain.compute_pose(&[92.0, 90.0, 90.0, 90.0, 90.0]);

        assert_pose_near(&pose, &Pose::new(0.0, 0.0, 483.87, 0.0, 0.0, -88.0), 1e-9);
    }

    #[test]
    fn test_zero_config() {
        let chain = KinChain::default();
        let pose = chain.compute_pose(&[0.0; NUM_JOINTS]);

        assert_pose_near(&pose, &Pose::new(-41.74, 0.0, -28.83, -90.0, 0.0, 90.0), 1e-9);
    }

    #[test]
    fn test_bent_config() {
        let chain = KinChain::default();
        let pose = chain.compute_pose(&[80.0, 100.0, 70.0, 110.0, 95.0]);

        assert_pose_near(
            &pose,
            &Pose::new(-5.013352, -28.432135, 477.835336, 0.880447, 9.961558, -94.923267),
            1e-5,
        );
    }

    #[test]
    fn test_fk_is_pure() {
        let chain = KinChain::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let mut q = [0.0; NUM_JOINTS];
            for a in q.iter_mut() {
                *a = rng.gen_range(0.0..=180.0);
            }

            let a = chain.compute_pose(&q);
            let b = chain.compute_pose(&q);

            assert_eq!(a.to_array(), b.to_array());
            assert!(a.position_mm.norm() <= chain.max_reach_mm());
        }
    }
}
