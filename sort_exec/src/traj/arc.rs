//! Circular arc through three points

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use std::f64::consts::TAU;

use super::{check_steps, TrajError};
use crate::kin::Pose;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Relative area below which three points are treated as collinear.
const COLLINEAR_TOL: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A circle fitted through three points, travelled from the first point
/// through the second to the third.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc3 {
    pub center: Vector3<f64>,

    /// Units: millimetres
    pub radius: f64,

    /// Unit vector from the center to the first point.
    u: Vector3<f64>,

    /// Unit vector completing the in-plane basis, in the direction of travel.
    v: Vector3<f64>,

    /// Angle swept from the first to the third point.
    ///
    /// Units: radians
    pub sweep_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Arc3 {
    /// Fit the circle through the three points.
    ///
    /// Collinear or coincident points are rejected before any division.
    pub fn fit(p1: &Vector3<f64>, p2: &Vector3<f64>, p3: &Vector3<f64>) -> Result<Self, TrajError> {
        let a = p1 - p3;
        let b = p2 - p3;
        let axb = a.cross(&b);

        if axb.norm() <= COLLINEAR_TOL * a.norm() * b.norm() {
            return Err(TrajError::Collinear);
        }

        // Circumradius from the side lengths and the triangle area
        let area = 0.5 * axb.norm();
        let radius = a.norm() * b.norm() * (p1 - p2).norm() / (4.0 * area);

        let center = p3
            + (b * a.norm_squared() - a * b.norm_squared()).cross(&axb)
                / (2.0 * axb.norm_squared());

        let normal = (p2 - p1).cross(&(p3 - p2)).normalize();
        let u = (p1 - center) / radius;
        let v = normal.cross(&u);

        let mut sweep_rad = Self::angle_of(&center, &u, &v, p3);
        if sweep_rad <= 0.0 {
            sweep_rad += TAU;
        }

        Ok(Self {
            center,
            radius,
            u,
            v,
            sweep_rad,
        })
    }

    fn angle_of(center: &Vector3<f64>, u: &Vector3<f64>, v: &Vector3<f64>, p: &Vector3<f64>) -> f64 {
        let r = p - center;
        r.dot(v).atan2(r.dot(u))
    }

    /// Point at fraction `s` of the sweep.
    pub fn point(&self, s: f64) -> Vector3<f64> {
        let theta = s * self.sweep_rad;
        self.center + (self.u * theta.cos() + self.v * theta.sin()) * self.radius
    }
}

/// Sample `steps` poses along the arc through the three waypoints.
///
/// Orientation is held at the first waypoint's orientation for the whole
/// arc.
pub fn circular(waypoints: &[Pose], steps: usize) -> Result<Vec<Pose>, TrajError> {
    let (p1, p2, p3) = match waypoints {
        [p1, p2, p3] => (p1, p2, p3),
        _ => {
            return Err(TrajError::WrongWaypointCount {
                expected: "exactly 3",
                found: waypoints.len(),
            })
        }
    };

    check_steps(steps)?;
    let arc = Arc3::fit(&p1.position_mm, &p2.position_mm, &p3.position_mm)?;

    Ok((0..steps)
        .map(|i| Pose {
            position_mm: arc.point(i as f64 / (steps - 1) as f64),
            rpy_deg: p1.rpy_deg,
        })
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;

    fn v(x: f64, y: f64, z: f64) -> Vector3<f64> {
        Vector3::new(x, y, z)
    }

    #[test]
    fn test_fit_unit_circle() {
        let arc = Arc3::fit(&v(1.0, 0.0, 5.0), &v(0.0, 1.0, 5.0), &v(-1.0, 0.0, 5.0)).unwrap();

        assert!((arc.center - v(0.0, 0.0, 5.0)).norm() < 1e-12);
        assert!((arc.radius - 1.0).abs() < 1e-12);
        assert!((arc.sweep_rad - std::f64::consts::PI).abs() < 1e-12);
        assert!((arc.point(0.5) - v(0.0, 1.0, 5.0)).norm() < 1e-12);
    }

    #[test]
    fn test_arc_passes_through_middle_point() {
        let p1 = v(100.0, 0.0, 200.0);
        let p2 = v(60.0, 80.0, 230.0);
        let p3 = v(-20.0, 90.0, 210.0);
        let arc = Arc3::fit(&p1, &p2, &p3).unwrap();

        // Long way round is not taken, the arc is shorter than a full turn and
        // the middle point lies on it
        assert!(arc.sweep_rad > 0.0 && arc.sweep_rad < TAU);
        assert!((arc.point(0.0) - p1).norm() < 1e-9);
        assert!((arc.point(1.0) - p3).norm() < 1e-9);

        let closest = (0..=10_000)
            .map(|i| (arc.point(i as f64 / 10_000.0) - p2).norm())
            .fold(f64::INFINITY, f64::min);
        assert!(closest < 0.1);

        for i in 0..=10 {
            let p = arc.point(i as f64 / 10.0);
            assert!(((p - arc.center).norm() - arc.radius).abs() < 1e-9);
        }
    }

    #[test]
    fn test_collinear_rejected() {
        let r = Arc3::fit(&v(0.0, 0.0, 0.0), &v(1.0, 1.0, 1.0), &v(3.0, 3.0, 3.0));
        assert!(matches!(r, Err(TrajError::Collinear)));

        let r = Arc3::fit(&v(1.0, 2.0, 3.0), &v(1.0, 2.0, 3.0), &v(3.0, 3.0, 3.0));
        assert!(matches!(r, Err(TrajError::Collinear)));
    }

    #[test]
    fn test_circular_holds_orientation() {
        let wps = [
            Pose::new(1.0, 0.0, 0.0, 10.0, 20.0, 30.0),
            Pose::new(0.0, 1.0, 0.0, 0.0, 0.0, 0.0),
            Pose::new(-1.0, 0.0, 0.0, -10.0, -20.0, -30.0),
        ];
        let poses = circular(&wps, 5).unwrap();

        assert_eq!(poses.len(), 5);
        assert!(poses.iter().all(|p| p.rpy_deg == wps[0].rpy_deg));
        assert!(circular(&wps[..2], 5).is_err());
    }
}
