//! # Trajectory module
//!
//! Trajectories are generated eagerly as a list of poses so that every
//! waypoint can be checked for reachability before any motion is committed.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod arc;
mod path;
mod spline;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::kin::Pose;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use arc::{circular, Arc3};
pub use path::{joint_path_to_movement, plan_joint_path};
pub use spline::CubicSpline;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Kind of trajectory to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrajKind {
    /// Straight line between exactly two poses.
    Linear,

    /// Arc through exactly three poses.
    Circular,

    /// Cubic spline through two or more poses.
    Spline,

    /// Waypoints used as given.
    Ptp,
}

/// Errors raised while generating or planning a trajectory.
#[derive(Debug, Error, PartialEq)]
pub enum TrajError {
    #[error("Expected {expected} waypoints, found {found}")]
    WrongWaypointCount { expected: &'static str, found: usize },

    #[error("At least 2 steps are required, found {0}")]
    TooFewSteps(usize),

    #[error("Circular trajectory waypoints are collinear or coincident")]
    Collinear,

    #[error("Could not solve for the spline coefficients")]
    SplineSolveFailed,

    #[error(
        "Waypoint {index} is unreachable (best {pos_err_mm:.3} mm, {orient_err_deg:.3} deg)"
    )]
    Unreachable {
        index: usize,
        pos_err_mm: f64,
        orient_err_deg: f64,
    },

    #[error("Unknown trajectory kind \"{0}\"")]
    UnknownKind(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl fmt::Display for TrajKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrajKind::Linear => "linear",
            TrajKind::Circular => "circular",
            TrajKind::Spline => "spline",
            TrajKind::Ptp => "ptp",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TrajKind {
    type Err = TrajError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(TrajKind::Linear),
            "circular" => Ok(TrajKind::Circular),
            "spline" => Ok(TrajKind::Spline),
            "ptp" => Ok(TrajKind::Ptp),
            other => Err(TrajError::UnknownKind(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Generate the poses of a trajectory.
///
/// `steps` is the number of poses produced, endpoints included. It is ignored
/// for [`TrajKind::Ptp`].
pub fn generate(kind: TrajKind, waypoints: &[Pose], steps: usize) -> Result<Vec<Pose>, TrajError> {
    match kind {
        TrajKind::Linear => linear(waypoints, steps),
        TrajKind::Circular => circular(waypoints, steps),
        TrajKind::Spline => spline(waypoints, steps),
        TrajKind::Ptp => {
            if waypoints.is_empty() {
                Err(TrajError::WrongWaypointCount {
                    expected: "at least 1",
                    found: 0,
                })
            } else {
                Ok(waypoints.to_vec())
            }
        }
    }
}

/// Straight line between two poses, interpolating every channel
/// independently.
pub fn linear(waypoints: &[Pose], steps: usize) -> Result<Vec<Pose>, TrajError> {
    let (start, end) = match waypoints {
        [start, end] => (start, end),
        _ => {
            return Err(TrajError::WrongWaypointCount {
                expected: "exactly 2",
                found: waypoints.len(),
            })
        }
    };
    check_steps(steps)?;

    Ok((0..steps)
        .map(|i| start.lerp(end, i as f64 / (steps - 1) as f64))
        .collect())
}

/// Cubic spline through the waypoints, knots equally spaced over `[0, 1]`.
pub fn spline(waypoints: &[Pose], steps: usize) -> Result<Vec<Pose>, TrajError> {
    check_steps(steps)?;

    let channels: Vec<CubicSpline> = (0..6)
        .map(|c| {
            let y: Vec<f64> = waypoints.iter().map(|w| w.to_array()[c]).collect();
            CubicSpline::fit(&y)
        })
        .collect::<Result<_, _>>()?;

    let mut poses: Vec<Pose> = (0..steps)
        .map(|i| {
            let t = i as f64 / (steps - 1) as f64;
            let mut a = [0f64; 6];
            for (v, s) in a.iter_mut().zip(channels.iter()) {
                *v = s.eval(t);
            }
            Pose::from_array(&a)
        })
        .collect();

    // Endpoints are copied so they match the waypoints bit for bit
    poses[0] = waypoints[0];
    poses[steps - 1] = waypoints[waypoints.len() - 1];

    Ok(poses)
}

/// Check a step count for the interpolating generators.
pub(crate) fn check_steps(steps: usize) -> Result<(), TrajError> {
    if steps < 2 {
        Err(TrajError::TooFewSteps(steps))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_linear_endpoints_exact() {
        let a = Pose::new(12.3, -45.6, 300.1, 0.3, 10.7, -90.1);
        let b = Pose::new(-80.9, 33.3, 250.7, -5.1, 4.4, -60.0);

        let poses = generate(TrajKind::Linear, &[a, b], 7).unwrap();

        assert_eq!(poses.len(), 7);
        assert_eq!(poses[0], a);
        assert_eq!(poses[6], b);
        assert!((poses[3].position_mm - (a.position_mm + b.position_mm) / 2.0).norm() < 1e-9);
    }

    #[test]
    fn test_spline_endpoints_exact() {
        let wps = [
            Pose::new(0.1, 0.2, 300.3, 1.0, 2.0, 3.0),
            Pose::new(50.0, 20.0, 280.0, 4.0, 0.0, -10.0),
            Pose::new(80.0, -10.0, 260.0, 2.0, 1.0, -20.0),
            Pose::new(100.7, -30.3, 250.9, 0.7, 3.3, -33.3),
        ];

        let poses = generate(TrajKind::Spline, &wps, 13).unwrap();

        assert_eq!(poses.len(), 13);
        assert_eq!(poses[0], wps[0]);
        assert_eq!(poses[12], wps[3]);

        // Knots fall on every fourth sample
        assert!(poses[4].position_error(&wps[1]) < 1e-9);
        assert!(poses[8].orientation_error(&wps[2]) < 1e-9);
    }

    #[test]
    fn test_spline_on_straight_line_stays_straight() {
        let wps: Vec<Pose> = (0..5)
            .map(|i| Pose::new(10.0 * i as f64, 200.0, 5.0 * i as f64, 0.0, 0.0, 0.0))
            .collect();

        for p in generate(TrajKind::Spline, &wps, 21).unwrap() {
            assert!((p.position_mm.z - p.position_mm.x / 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ptp_passthrough() {
        let wps = [
            Pose::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0),
            Pose::new(6.0, 5.0, 4.0, 3.0, 2.0, 1.0),
        ];
        assert_eq!(generate(TrajKind::Ptp, &wps, 100).unwrap(), wps.to_vec());
        assert!(generate(TrajKind::Ptp, &[], 2).is_err());
    }

    #[test]
    fn test_bad_inputs() {
        let p = Pose::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);

        assert_eq!(
            generate(TrajKind::Linear, &[p, p, p], 5),
            Err(TrajError::WrongWaypointCount {
                expected: "exactly 2",
                found: 3
            })
        );
        assert_eq!(generate(TrajKind::Linear, &[p, p], 1), Err(TrajError::TooFewSteps(1)));
        assert_eq!(generate(TrajKind::Circular, &[p, p, p], 5), Err(TrajError::Collinear));
        assert!(generate(TrajKind::Spline, &[p], 5).is_err());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Spline".parse(), Ok(TrajKind::Spline));
        assert_eq!(TrajKind::Circular.to_string(), "circular");
        assert!("bezier".parse::<TrajKind>().is_err());
    }
}
