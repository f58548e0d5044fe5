//! Effector pose

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Matrix4, Rotation3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use util::maths::lerp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Position and orientation of the effector in the base frame.
///
/// Orientation is held as roll, pitch, yaw extracted from a rotation matrix.
/// The decomposition is not unique near gimbal lock, which is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position of the effector.
    ///
    /// Units: millimetres
    pub position_mm: Vector3<f64>,

    /// Roll, pitch and yaw of the effector.
    ///
    /// Units: degrees
    pub rpy_deg: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_mm: f64, y_mm: f64, z_mm: f64, roll_deg: f64, pitch_deg: f64, yaw_deg: f64) -> Self {
        Self {
            position_mm: Vector3::new(x_mm, y_mm, z_mm),
            rpy_deg: Vector3::new(roll_deg, pitch_deg, yaw_deg),
        }
    }

    /// Extract the pose from a homogeneous transform.
    ///
    /// roll = atan2(R32, R33), pitch = asin(-R31), yaw = atan2(R21, R11).
    pub fn from_transform(t: &Matrix4<f64>) -> Self {
        let roll = t[(2, 1)].atan2(t[(2, 2)]);
        // Rounding can push |R31| fractionally past 1
        let pitch = (-t[(2, 0)]).max(-1.0).min(1.0).asin();
        let yaw = t[(1, 0)].atan2(t[(0, 0)]);

        Self {
            position_mm: Vector3::new(t[(0, 3)], t[(1, 3)], t[(2, 3)]),
            rpy_deg: Vector3::new(roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()),
        }
    }

    /// Rotation of the effector frame, the inverse of the extraction in
    /// [`Pose::from_transform`] away from gimbal lock.
    pub fn rotation(&self) -> Rotation3<f64> {
        let rpy = self.rpy_deg.map(f64::to_radians);
        Rotation3::from_euler_angles(rpy.x, rpy.y, rpy.z)
    }

    /// Euclidean distance between the two positions.
    ///
    /// Units: millimetres
    pub fn position_error(&self, other: &Pose) -> f64 {
        (self.position_mm - other.position_mm).norm()
    }

    /// Euclidean norm of the raw roll, pitch and yaw differences.
    ///
    /// This does not wrap at +/-180 degrees, targets close to the wrap point
    /// will report large errors. Stored movements were tuned against this
    /// metric so it is kept as is.
    ///
    /// Units: degrees
    pub fn orientation_error(&self, other: &Pose) -> f64 {
        (self.rpy_deg - other.rpy_deg).norm()
    }

    /// Component-wise linear interpolation, exact at `t = 0` and `t = 1`.
    pub fn lerp(&self, other: &Pose, t: f64) -> Pose {
        Pose {
            position_mm: self.position_mm.zip_map(&other.position_mm, |a, b| lerp(a, b, t)),
            rpy_deg: self.rpy_deg.zip_map(&other.rpy_deg, |a, b| lerp(a, b, t)),
        }
    }

    /// The six channels of the pose, position first.
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.position_mm.x,
            self.position_mm.y,
            self.position_mm.z,
            self.rpy_deg.x,
            self.rpy_deg.y,
            self.rpy_deg.z,
        ]
    }

    pub fn from_array(a: &[f64; 6]) -> Self {
        Self::new(a[0], a[1], a[2], a[3], a[4], a[5])
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}, {:.2}) mm, rpy ({:.2}, {:.2}, {:.2}) deg",
            self.position_mm.x,
            self.position_mm.y,
            self.position_mm.z,
            self.rpy_deg.x,
            self.rpy_deg.y,
            self.rpy_deg.z
        )
    }
}
