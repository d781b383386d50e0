//! Shape-preserving piecewise cubic Hermite interpolation (PCHIP).
//!
//! Tide predictions come as a handful of highs and lows a few hours apart.
//! A plain cubic spline overshoots between them, inventing tides higher
//! than predicted; PCHIP picks slopes with the Fritsch–Carlson rule so the
//! curve never leaves the range of neighbouring points.

use std::fmt;

/// Returned when knots cannot define an interpolant.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpolationError {
    /// Fewer than two knots.
    TooFewPoints(usize),
    /// `x` and `y` have different lengths.
    LengthMismatch {
        /// Number of abscissae.
        x: usize,
        /// Number of ordinates.
        y: usize,
    },
    /// `x` is not strictly increasing at this index.
    NotIncreasing(usize),
}

impl fmt::Display for InterpolationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewPoints(n) => write!(f, "need at least two points, got {}", n),
            Self::LengthMismatch { x, y } => write!(f, "{} x values but {} y values", x, y),
            Self::NotIncreasing(i) => write!(f, "x is not strictly increasing at index {}", i),
        }
    }
}

impl std::error::Error for InterpolationError {}

/// A PCHIP interpolant through a set of knots.
#[derive(Debug, Clone, PartialEq)]
pub struct Pchip {
    x: Vec<f64>,
    y: Vec<f64>,
    slopes: Vec<f64>,
}

impl Pchip {
    /// Fit through `(x[i], y[i])`. `x` must be strictly increasing.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, InterpolationError> {
        if x.len() != y.len() {
            return Err(InterpolationError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.len() < 2 {
            return Err(InterpolationError::TooFewPoints(x.len()));
        }
        if let Some(i) = x.windows(2).position(|w| !(w[0] < w[1])) {
            return Err(InterpolationError::NotIncreasing(i + 1));
        }

        let slopes = slopes(x, y);
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            slopes,
        })
    }

    /// First and last knot abscissae.
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Value at `t`, or `None` outside the knots.
    pub fn evaluate(&self, t: f64) -> Option<f64> {
        let (lo, hi) = self.domain();
        if !(lo <= t && t <= hi) {
            return None;
        }

        // Index of the interval [x[k], x[k+1]] holding t
        let k = match self.x.partition_point(|&xi| xi <= t) {
            0 => 0,
            p => (p - 1).min(self.x.len() - 2),
        };

        let h = self.x[k + 1] - self.x[k];
        let s = (t - self.x[k]) / h;
        let (h00, h10, h01, h11) = (
            (1.0 + 2.0 * s) * (1.0 - s) * (1.0 - s),
            s * (1.0 - s) * (1.0 - s),
            s * s * (3.0 - 2.0 * s),
            s * s * (s - 1.0),
        );

        Some(
            h00 * self.y[k]
                + h10 * h * self.slopes[k]
                + h01 * self.y[k + 1]
                + h11 * h * self.slopes[k + 1],
        )
    }

    /// `n` evenly spaced `(x, y)` points across the whole domain, for
    /// drawing a smooth curve.
    pub fn resample(&self, n: usize) -> Vec<(f64, f64)> {
        let (lo, hi) = self.domain();
        match n {
            0 => Vec::new(),
            1 => vec![(lo, self.y[0])],
            _ => (0..n)
                .map(|i| {
                    let t = if i == n - 1 {
                        hi
                    } else {
                        lo + (hi - lo) * i as f64 / (n - 1) as f64
                    };
                    (t, self.evaluate(t).unwrap_or(f64::NAN))
                })
                .collect(),
        }
    }
}

/// Knot derivatives, using SciPy's rules: weighted harmonic mean of the
/// neighbouring secants in the interior (zero at extrema), and a one-sided
/// three-point estimate at the ends that is kept shape-preserving.
fn slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let delta: Vec<f64> = (0..n - 1).map(|k| (y[k + 1] - y[k]) / h[k]).collect();

    if n == 2 {
        return vec![delta[0], delta[0]];
    }

    let mut d = vec![0.0; n];
    for k in 1..n - 1 {
        if delta[k - 1] * delta[k] > 0.0 {
            let w1 = 2.0 * h[k] + h[k - 1];
            let w2 = h[k] + 2.0 * h[k - 1];
            d[k] = (w1 + w2) / (w1 / delta[k - 1] + w2 / delta[k]);
        }
    }
    d[0] = edge_slope(h[0], h[1], delta[0], delta[1]);
    d[n - 1] = edge_slope(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
    d
}

/// -1, 0 or 1. Unlike [`f64::signum`], zero maps to zero.
fn sign(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v.signum()
    }
}

fn edge_slope(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if sign(d) != sign(m0) {
        0.0
    } else if sign(m0) != sign(m1) && d.abs() > 3.0 * m0.abs() {
        3.0 * m0
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn passes_through_the_knots() {
        let x = [0.0, 1.0, 3.0, 4.0, 7.0];
        let y = [0.56, 1.95, -0.33, 1.21, 0.68];
        let p = Pchip::new(&x, &y).unwrap();

        for (xi, yi) in x.iter().zip(y) {
            assert!(close(p.evaluate(*xi).unwrap(), yi));
        }
    }

    #[test]
    fn two_points_is_a_straight_line() {
        let p = Pchip::new(&[0.0, 10.0], &[1.0, 3.0]).unwrap();
        assert!(close(p.evaluate(2.5).unwrap(), 1.5));
    }

    #[test]
    fn linear_data_stays_linear() {
        let x = [0.0, 1.0, 2.0, 4.0];
        let y = [0.0, 2.0, 4.0, 8.0];
        let p = Pchip::new(&x, &y).unwrap();
        assert!(close(p.evaluate(3.0).unwrap(), 6.0));
        assert!(close(p.evaluate(0.5).unwrap(), 1.0));
    }

    #[test]
    fn never_overshoots_between_a_high_and_a_low() {
        let x = [0.0, 6.0, 13.0, 19.0];
        let y = [0.56, 1.95, -0.33, 1.21];
        let p = Pchip::new(&x, &y).unwrap();

        for (t, v) in p.resample(200) {
            let k = x.iter().rposition(|&xi| xi <= t).unwrap().min(2);
            let (lo, hi) = if y[k] < y[k + 1] {
                (y[k], y[k + 1])
            } else {
                (y[k + 1], y[k])
            };
            assert!(lo - 1e-12 <= v && v <= hi + 1e-12, "{} at {} escapes [{}, {}]", v, t, lo, hi);
        }
    }

    #[test]
    fn flat_at_local_extrema() {
        let p = Pchip::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]).unwrap();
        assert_eq!(p.slopes[1], 0.0);
    }

    #[test]
    fn outside_the_knots_is_none() {
        let p = Pchip::new(&[0.0, 1.0], &[0.0, 1.0]).unwrap();
        assert_eq!(p.evaluate(-0.1), None);
        assert_eq!(p.evaluate(1.1), None);
    }

    #[test]
    fn bad_knots_are_rejected() {
        assert_eq!(
            Pchip::new(&[0.0], &[1.0]),
            Err(InterpolationError::TooFewPoints(1))
        );
        assert_eq!(
            Pchip::new(&[0.0, 1.0], &[1.0]),
            Err(InterpolationError::LengthMismatch { x: 2, y: 1 })
        );
        assert_eq!(
            Pchip::new(&[0.0, 1.0, 1.0], &[1.0, 2.0, 3.0]),
            Err(InterpolationError::NotIncreasing(2))
        );
    }

    #[test]
    fn resample_spans_the_domain() {
        let p = Pchip::new(&[2.0, 4.0, 8.0], &[1.0, 0.0, 1.0]).unwrap();
        let curve = p.resample(5);
        assert_eq!(curve.len(), 5);
        assert_eq!(curve[0].0, 2.0);
        assert_eq!(curve[4].0, 8.0);
        assert!(close(curve[4].1, 1.0));
    }
}
