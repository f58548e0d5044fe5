//! Joint space planning of generated trajectories

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, warn};

use super::TrajError;
use crate::ik::IkStrategy;
use crate::kin::{JointConfig, KinChain, Pose};
use crate::motion::{
    joints_to_servos,
    movement::{Movement, MovementStep},
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve every pose of a trajectory, seeding each solve with the previous
/// solution.
///
/// An unreachable waypoint aborts the whole path, skipping it would break the
/// continuity of the motion.
pub fn plan_joint_path(
    chain: &KinChain,
    poses: &[Pose],
    seed: &JointConfig,
    solver: &dyn IkStrategy,
) -> Result<Vec<JointConfig>, TrajError> {
    let mut path = Vec::with_capacity(poses.len());
    let mut prev = *seed;

    for (index, pose) in poses.iter().enumerate() {
        let sol = solver.solve(chain, pose, &prev);

        if !sol.converged {
            warn!("Trajectory waypoint {} ({}) is unreachable", index, pose);
            return Err(TrajError::Unreachable {
                index,
                pos_err_mm: sol.pos_err_mm,
                orient_err_deg: sol.orient_err_deg,
            });
        }

        debug!("Waypoint {} solved in {} iterations", index, sol.iterations);

        path.push(sol.joints);
        prev = sol.joints;
    }

    Ok(path)
}

/// Build an executable movement from a joint path, holding the gripper at a
/// fixed angle.
pub fn joint_path_to_movement(
    name: &str,
    path: &[JointConfig],
    speed: u8,
    gripper_deg: f64,
) -> Movement {
    Movement {
        name: name.to_string(),
        steps: path
            .iter()
            .map(|j| MovementStep {
                speed,
                servos: joints_to_servos(j, gripper_deg),
            })
            .collect(),
    }
}
