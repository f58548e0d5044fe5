//! # Motion module
//!
//! Everything between a target configuration and the actuator channel: open
//! loop timing estimates, command issuing for the arm and conveyor, and the
//! execution of stored movements.
//!
//! The arm has no position feedback. The only synchronisation available is to
//! sleep for the estimated duration of a move before issuing the next one.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod arm;
pub mod channel;
pub mod clock;
pub mod conveyor;
pub mod movement;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::arm::NUM_SERVOS;
use serde::{Deserialize, Serialize};
use util::maths::lin_map;

use crate::kin::{JointConfig, NUM_JOINTS};

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// Logical servo angles, base first and gripper last.
///
/// Units: degrees
pub type ServoAngles = [f64; NUM_SERVOS];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Calibration of the open loop timing estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingParams {
    /// Angular rate of a servo commanded at 100% speed.
    ///
    /// Units: degrees/second
    pub full_speed_deg_s: f64,

    /// Time added to every move to let the arm settle.
    ///
    /// Units: seconds
    pub settle_buffer_s: f64,
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            full_speed_deg_s: 60.0,
            settle_buffer_s: 0.2,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Estimate how long a move between two configurations takes.
///
/// The largest joint delta is divided by the rate for `speed_pct` and the
/// settle buffer is added. A speed of zero or less means no motion and gives
/// zero.
///
/// Units: seconds
pub fn estimate_duration(from: &[f64], to: &[f64], speed_pct: f64, params: &TimingParams) -> f64 {
    if !(speed_pct > 0.0) || to.is_empty() {
        return 0.0;
    }

    let max_delta = from
        .iter()
        .zip(to.iter())
        .map(|(a, b)| (b - a).abs())
        .fold(0.0, f64::max);

    let rate_deg_s = lin_map((0.0, 100.0), (0.0, params.full_speed_deg_s), speed_pct);

    max_delta / rate_deg_s + params.settle_buffer_s
}

/// Servo angles for a chain configuration, with the gripper appended.
pub fn joints_to_servos(joints: &JointConfig, gripper_deg: f64) -> ServoAngles {
    let mut servos = [gripper_deg; NUM_SERVOS];
    servos[..NUM_JOINTS].copy_from_slice(joints);
    servos
}

/// Chain configuration of a set of servo angles, dropping the gripper.
pub fn servos_to_joints(servos: &ServoAngles) -> JointConfig {
    let mut joints = [0.0; NUM_JOINTS];
    joints.copy_from_slice(&servos[..NUM_JOINTS]);
    joints
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_estimate_duration() {
        let p = TimingParams::default();
        let from = [90.0; 6];
        let to = [90.0, 120.0, 60.0, 90.0, 90.0, 90.0];

        // 30 degrees at 50% of 60 deg/s takes 1 s
        assert!((estimate_duration(&from, &to, 50.0, &p) - 1.2).abs() < 1e-12);
        assert!((estimate_duration(&from, &to, 100.0, &p) - 0.7).abs() < 1e-12);

        // No motion still waits for the settle buffer
        assert!((estimate_duration(&from, &from, 10.0, &p) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_zero_speed_is_no_motion() {
        let p = TimingParams::default();
        assert_eq!(estimate_duration(&[0.0; 6], &[180.0; 6], 0.0, &p), 0.0);
        assert_eq!(estimate_duration(&[0.0; 6], &[180.0; 6], -5.0, &p), 0.0);
    }

    #[test]
    fn test_servo_conversion() {
        let j = [10.0, 20.0, 30.0, 40.0, 50.0];
        let s = joints_to_servos(&j, 75.0);

        assert_eq!(s, [10.0, 20.0, 30.0, 40.0, 50.0, 75.0]);
        assert_eq!(servos_to_joints(&s), j);
    }
}
