//! Cubic spline interpolation over equally spaced knots
//!
//! The spline uses not-a-knot end conditions: the third derivative is
//! continuous across the second and second to last knots. With three knots
//! this reduces to the interpolating parabola, with two to a straight line.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector};

use super::TrajError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One interpolated channel, parameterised over `t` in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    /// Knot spacing
    h: f64,

    /// Knot values
    y: Vec<f64>,

    /// Second derivatives at the knots
    m: Vec<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CubicSpline {
    /// Fit a spline through `y`, with knot `i` at `t = i / (n - 1)`.
    pub fn fit(y: &[f64]) -> Result<Self, TrajError> {
        let n = y.len();
        if n < 2 {
            return Err(TrajError::WrongWaypointCount {
                expected: "at least 2",
                found: n,
            });
        }

        let h = 1.0 / (n - 1) as f64;

        let m = match n {
            2 => vec![0.0; 2],
            3 => vec![(y[0] - 2.0 * y[1] + y[2]) / (h * h); 3],
            _ => Self::solve_not_a_knot(y, h)?,
        };

        Ok(Self { h, y: y.to_vec(), m })
    }

    /// Solve for the knot second derivatives.
    fn solve_not_a_knot(y: &[f64], h: f64) -> Result<Vec<f64>, TrajError> {
        let n = y.len();
        let mut a = DMatrix::<f64>::zeros(n, n);
        let mut b = DVector::<f64>::zeros(n);

        // Third derivative continuity at the second knot
        a[(0, 0)] = 1.0;
        a[(0, 1)] = -2.0;
        a[(0, 2)] = 1.0;

        for i in 1..(n - 1) {
            a[(i, i - 1)] = 1.0;
            a[(i, i)] = 4.0;
            a[(i, i + 1)] = 1.0;
            b[i] = 6.0 * (y[i - 1] - 2.0 * y[i] + y[i + 1]) / (h * h);
        }

        // And at the second to last
        a[(n - 1, n - 3)] = 1.0;
        a[(n - 1, n - 2)] = -2.0;
        a[(n - 1, n - 1)] = 1.0;

        a.lu()
            .solve(&b)
            .map(|m| m.iter().copied().collect())
            .ok_or(TrajError::SplineSolveFailed)
    }

    /// Evaluate the spline at `t`, clamped into `[0, 1]`.
    pub fn eval(&self, t: f64) -> f64 {
        let t = t.max(0.0).min(1.0);
        let h = self.h;

        let seg = ((t / h).floor() as usize).min(self.y.len() - 2);

        let x0 = seg as f64 * h;
        let a = (x0 + h) - t;
        let b = t - x0;

        let (y0, y1) = (self.y[seg], self.y[seg + 1]);
        let (m0, m1) = (self.m[seg], self.m[seg + 1]);

        m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }
}
