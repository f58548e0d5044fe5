//! Denavit-Hartenberg link parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One rigid link of the chain, in the standard DH convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DhLink {
    /// Offset added to the joint angle.
    ///
    /// Units: degrees
    pub theta_offset_deg: f64,

    /// Offset along the previous z axis.
    ///
    /// Units: millimetres
    pub d_mm: f64,

    /// Length along the common normal.
    ///
    /// Units: millimetres
    pub a_mm: f64,

    /// Twist about the common normal.
    ///
    /// Units: degrees
    pub alpha_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DhLink {
    pub const fn new(theta_offset_deg: f64, d_mm: f64, a_mm: f64, alpha_deg: f64) -> Self {
        Self {
            theta_offset_deg,
            d_mm,
            a_mm,
            alpha_deg,
        }
    }

    /// Homogeneous transform of this link for the given joint angle.
    #[rustfmt::skip]
    pub fn transform(&self, joint_deg: f64) -> Matrix4<f64> {
        let (st, ct) = (self.theta_offset_deg + joint_deg).to_radians().sin_cos();
        let (sa, ca) = self.alpha_deg.to_radians().sin_cos();

        Matrix4::new(
            ct, -st * ca, st * sa, self.a_mm * ct,
            st, ct * ca, -ct * sa, self.a_mm * st,
            0.0, sa, ca, self.d_mm,
            0.0, 0.0, 0.0, 1.0,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zero_link_is_identity() {
        let link = DhLink::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(link.transform(0.0), Matrix4::identity());
    }

    #[test]
    fn test_link_transform() {
        // Pure translation along x rotated by 90 degrees about z
        let link = DhLink::new(0.0, 10.0, 120.0, 0.0);
        let t = link.transform(90.0);

        assert!((t[(0, 3)] - 0.0).abs() < 1e-9);
        assert!((t[(1, 3)] - 120.0).abs() < 1e-9);
        assert!((t[(2, 3)] - 10.0).abs() < 1e-9);
        assert!((t[(1, 0)] - 1.0).abs() < 1e-12);
    }
}
