//! Closed form starting points for the local solver
//!
//! The arm yaws about the base, pitches about three parallel axes and rolls
//! about the approach axis, so the effector always lies in the vertical plane
//! picked by the base joint. Solving that plane geometrically gives up to four
//! configurations: base facing the target or reversed, elbow up or elbow down.
//! For the default table these are exact. For a modified table they are only
//! starting guesses and the local solver has the final word.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;

use crate::kin::{clamp_joint, JointConfig, KinChain, Pose, JOINT_RANGE_DEG, NUM_JOINTS};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Base angles further than this outside the joint range are not tried.
///
/// Units: degrees
const BASE_MARGIN_DEG: f64 = 1.0;

/// Below this horizontal distance the target is on the base axis and the
/// base angle is taken from the approach axis instead.
///
/// Units: millimetres
const ON_AXIS_MM: f64 = 1e-9;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Candidate configurations for `target`, all within the joint range.
pub fn geometric_seeds(chain: &KinChain, target: &Pose) -> Vec<JointConfig> {
    let links = chain.links();
    let d1 = links[0].d_mm;
    let a2 = links[1].a_mm;
    let a3 = links[2].a_mm;
    let d5 = links[4].d_mm;

    let mut offset = [0.0; NUM_JOINTS];
    for (o, l) in offset.iter_mut().zip(links.iter()) {
        *o = l.theta_offset_deg;
    }

    let rot = target.rotation();
    let approach: Vector3<f64> = rot.matrix().column(2).into_owned();
    let x_axis: Vector3<f64> = rot.matrix().column(0).into_owned();
    let p = target.position_mm;

    let azimuth = if p.x.hypot(p.y) > ON_AXIS_MM {
        p.y.atan2(p.x)
    } else {
        approach.y.atan2(approach.x)
    }
    .to_degrees();

    let mut seeds = Vec::with_capacity(4);

    for theta1 in [azimuth, azimuth + 180.0, azimuth - 180.0].iter() {
        let q1 = theta1 - offset[0];
        if q1 < JOINT_RANGE_DEG.0 - BASE_MARGIN_DEG || q1 > JOINT_RANGE_DEG.1 + BASE_MARGIN_DEG {
            continue;
        }

        // Unit vector of the arm plane's horizontal axis
        let (s1, c1) = theta1.to_radians().sin_cos();
        let u = Vector3::new(c1, s1, 0.0);
        let up = Vector3::z();

        // Elevation of the approach axis within the plane
        let psi = approach.z.atan2(approach.dot(&u));

        // Wrist centre relative to the shoulder
        let wr = p.dot(&u) - d5 * psi.cos();
        let wz = p.z - d5 * psi.sin() - d1;

        let cos_elbow = ((wr * wr + wz * wz - a2 * a2 - a3 * a3) / (2.0 * a2 * a3))
            .max(-1.0)
            .min(1.0);

        // Wrist frame before the roll joint
        let z4 = u * psi.cos() + up * psi.sin();
        let x4 = up * psi.cos() - u * psi.sin();
        let y4 = z4.cross(&x4);
        let theta5 = x_axis.dot(&y4).atan2(x_axis.dot(&x4)).to_degrees();

        for elbow in [cos_elbow.acos(), -cos_elbow.acos()].iter() {
            let theta2 =
                (wz.atan2(wr) - (a3 * elbow.sin()).atan2(a2 + a3 * elbow.cos())).to_degrees();
            let theta3 = elbow.to_degrees();
            let theta4 = psi.to_degrees() + 90.0 - theta2 - theta3;

            let thetas = [*theta1, theta2, theta3, theta4, theta5];
            let mut q = [0.0; NUM_JOINTS];
            for ((q, theta), o) in q.iter_mut().zip(thetas.iter()).zip(offset.iter()) {
                *q = clamp_joint(wrap_about_mid_range(theta - o));
            }

            seeds.push(q);
        }
    }

    seeds
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Wrap an angle into the turn centred on the middle of the joint range, so
/// that clamping moves it to the nearer limit.
fn wrap_about_mid_range(angle_deg: f64) -> f64 {
    let mid = 0.5 * (JOINT_RANGE_DEG.0 + JOINT_RANGE_DEG.1);
    (angle_deg - mid + 180.0).rem_euclid(360.0) + mid - 180.0
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kin::is_in_range;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn max_diff(a: &JointConfig, b: &JointConfig) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap_about_mid_range(90.0), 90.0);
        assert_eq!(wrap_about_mid_range(-100.0), 260.0);
        assert_eq!(wrap_about_mid_range(300.0), -60.0);
        assert_eq!(clamp_joint(wrap_about_mid_range(181.0)), 180.0);
    }

    #[test]
    fn test_bent_config_is_recovered() {
        let chain = KinChain::default();
        let q = [80.0, 100.0, 70.0, 110.0, 95.0];

        let seeds = geometric_seeds(&chain, &chain.compute_pose(&q));

        assert!(seeds.iter().any(|s| max_diff(s, &q) < 1e-4), "{:?}", seeds);
    }

    #[test]
    fn test_sampled_configs_are_recovered() {
        let chain = KinChain::default();
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..200 {
            let mut q = [0.0; NUM_JOINTS];
            for a in q.iter_mut() {
                *a = rng.gen_range(30.0..=150.0);
            }

            let seeds = geometric_seeds(&chain, &chain.compute_pose(&q));

            assert!(!seeds.is_empty() && seeds.len() <= 4);
            assert!(seeds.iter().all(is_in_range));
            assert!(
                seeds.iter().any(|s| max_diff(s, &q) < 1e-4),
                "{:?} not among {:?}",
                q,
                seeds
            );
        }
    }

    #[test]
    fn test_unreachable_target_still_in_range() {
        let chain = KinChain::default();
        let seeds = geometric_seeds(&chain, &Pose::new(1000.0, 0.0, 0.0, 0.0, 0.0, 0.0));

        assert!(seeds.iter().all(is_in_range));
    }
}
