//! # Kinematics module
//!
//! The arm is described by a fixed five link Denavit-Hartenberg table. Joint
//! angles are in degrees, positions in millimetres.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod chain;
mod dh;
mod pose;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use chain::KinChain;
pub use dh::DhLink;
pub use pose::Pose;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of actuated joints in the kinematic chain.
pub const NUM_JOINTS: usize = 5;

/// Physical range of every joint.
///
/// Units: degrees
pub const JOINT_RANGE_DEG: (f64, f64) = (0.0, 180.0);

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// Joint angles of the chain, base first.
///
/// Units: degrees
pub type JointConfig = [f64; NUM_JOINTS];

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Clamp a single joint angle into the physical range.
pub fn clamp_joint(angle_deg: f64) -> f64 {
    util::maths::clamp(&angle_deg, &JOINT_RANGE_DEG.0, &JOINT_RANGE_DEG.1)
}

/// Clamp every joint of a configuration into the physical range.
pub fn clamp_config(config: &JointConfig) -> JointConfig {
    let mut out = *config;
    for a in out.iter_mut() {
        *a = clamp_joint(*a);
    }
    out
}

/// Check that all joints are finite and within the physical range.
pub fn is_in_range(config: &JointConfig) -> bool {
    config
        .iter()
        .all(|a| a.is_finite() && *a >= JOINT_RANGE_DEG.0 && *a <= JOINT_RANGE_DEG.1)
}
