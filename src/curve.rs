//! Least-squares trajectory fitting.
//!
//! The user's saved tracks are projected onto two audio features and a
//! second-degree polynomial `y = a·x² + b·x + c` is fitted through them.
//! Sampling that polynomial over `[0, 1]` gives the trajectory the playlist
//! builder walks.

use crate::error::{Error, Result};
use crate::pool::Pool;
use crate::track::Feature;
use log::debug;
use serde::{Deserialize, Serialize};

/// Pivots smaller than this are treated as a singular system.
const SINGULAR_EPSILON: f64 = 1e-12;

/// A target position in the two-feature plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub x: f64,
    pub y: f64,
}

impl TrajectoryPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `(x, y)`.
    #[must_use]
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

/// Polynomial coefficients, highest degree first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    pub coefficients: Vec<f64>,
}

impl Polynomial {
    /// Evaluates with Horner's scheme.
    #[must_use]
    pub fn eval(&self, x: f64) -> f64 {
        self.coefficients.iter().fold(0.0, |acc, &c| acc * x + c)
    }

    #[must_use]
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Samples the polynomial at `count` evenly spaced x values over `[0, 1]`.
    #[must_use]
    pub fn sample_unit_interval(&self, count: usize) -> Vec<TrajectoryPoint> {
        linspace(0.0, 1.0, count)
            .map(|x| TrajectoryPoint::new(x, self.eval(x)))
            .collect()
    }
}

/// `count` evenly spaced values over the closed interval `[start, end]`.
///
/// A single sample lands on `start`.
pub fn linspace(start: f64, end: f64, count: usize) -> impl Iterator<Item = f64> {
    let step = if count > 1 {
        (end - start) / (count - 1) as f64
    } else {
        0.0
    };
    (0..count).map(move |i| {
        if i + 1 == count && count > 1 {
            end
        } else {
            start + step * i as f64
        }
    })
}

/// Complete `(x, y)` pairs from the pool, skipping tracks missing either value.
#[must_use]
pub fn feature_pairs(pool: &Pool, axis_x: Feature, axis_y: Feature) -> Vec<(f64, f64)> {
    pool.iter()
        .filter_map(|track| track.point(axis_x, axis_y))
        .collect()
}

/// Fits `y = a·x² + b·x + c` by solving the normal equations.
///
/// # Errors
///
/// Returns [`Error::Fit`] with fewer than three pairs or a singular system.
pub fn fit_quadratic(pairs: &[(f64, f64)]) -> Result<Polynomial> {
    if pairs.len() < 3 {
        return Err(Error::Fit(format!(
            "need at least 3 complete feature pairs for a second-degree fit, got {}",
            pairs.len()
        )));
    }

    // Power sums of x and the moments of y against them.
    let mut s = [0.0f64; 5];
    let mut t = [0.0f64; 3];
    for &(x, y) in pairs {
        let mut power = 1.0;
        for (k, sum) in s.iter_mut().enumerate() {
            *sum += power;
            if k < 3 {
                t[k] += power * y;
            }
            power *= x;
        }
    }

    //   | s4 s3 s2 | | a |   | t2 |
    //   | s3 s2 s1 | | b | = | t1 |
    //   | s2 s1 s0 | | c |   | t0 |
    let coefficients = solve(
        vec![
            vec![s[4], s[3], s[2]],
            vec![s[3], s[2], s[1]],
            vec![s[2], s[1], s[0]],
        ],
        vec![t[2], t[1], t[0]],
    )?;

    Ok(Polynomial { coefficients })
}

/// Fits `y = m·x + q`. Used for diagnostics.
///
/// # Errors
///
/// Returns [`Error::Fit`] with fewer than two pairs or when all x are equal.
pub fn fit_linear(pairs: &[(f64, f64)]) -> Result<Polynomial> {
    if pairs.len() < 2 {
        return Err(Error::Fit(format!(
            "need at least 2 complete feature pairs for a first-degree fit, got {}",
            pairs.len()
        )));
    }

    let n = pairs.len() as f64;
    let (sx, sxx, sy, sxy) = pairs.iter().fold((0.0, 0.0, 0.0, 0.0), |acc, &(x, y)| {
        (acc.0 + x, acc.1 + x * x, acc.2 + y, acc.3 + x * y)
    });

    let coefficients = solve(vec![vec![sxx, sx], vec![sx, n]], vec![sxy, sy])?;
    Ok(Polynomial { coefficients })
}

/// Gaussian elimination with partial pivoting on a small dense system.
fn solve(mut m: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Result<Vec<f64>> {
    let n = rhs.len();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
            .unwrap_or(col);

        if m[pivot][col].is_nan() || m[pivot][col].abs() < SINGULAR_EPSILON {
            return Err(Error::Fit(
                "normal equations are singular; feature values are too degenerate".to_string(),
            ));
        }

        if pivot != col {
            m.swap(col, pivot);
            rhs.swap(col, pivot);
        }

        let pivot_row = m[col].clone();
        let pivot_rhs = rhs[col];
        for row in (col + 1)..n {
            let factor = m[row][col] / pivot_row[col];
            for j in col..n {
                m[row][j] -= factor * pivot_row[j];
            }
            rhs[row] -= factor * pivot_rhs;
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|j| m[row][j] * solution[j]).sum();
        solution[row] = (rhs[row] - tail) / m[row][row];
    }

    if solution.iter().all(|c| c.is_finite()) {
        Ok(solution)
    } else {
        Err(Error::Fit("fit produced non-finite coefficients".to_string()))
    }
}

/// Fits the pool's trajectory and samples it at `num_points` points.
///
/// # Errors
///
/// Returns [`Error::Fit`] when the pool cannot support a second-degree fit.
pub fn fit_trajectory(
    pool: &Pool,
    axis_x: Feature,
    axis_y: Feature,
    num_points: usize,
) -> Result<Vec<TrajectoryPoint>> {
    let pairs = feature_pairs(pool, axis_x, axis_y);
    let polynomial = fit_quadratic(&pairs)?;

    debug!(
        "Fitted {axis_y} = {:.4}·{axis_x}² + {:.4}·{axis_x} + {:.4} over {} of {} tracks",
        polynomial.coefficients[0],
        polynomial.coefficients[1],
        polynomial.coefficients[2],
        pairs.len(),
        pool.len()
    );

    Ok(polynomial.sample_unit_interval(num_points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Track;

    const TOLERANCE: f64 = 1e-9;

    fn pool_from(points: &[(f64, f64)]) -> Pool {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                Track::with_point(&i.to_string(), Feature::Energy, x, Feature::Danceability, y)
            })
            .collect()
    }

    #[test]
    fn test_fit_recovers_parabola() {
        let poly = fit_quadratic(&[(0.0, 0.0), (0.5, 0.25), (1.0, 1.0)]).unwrap();

        assert!((poly.coefficients[0] - 1.0).abs() < TOLERANCE);
        assert!(poly.coefficients[1].abs() < TOLERANCE);
        assert!(poly.coefficients[2].abs() < TOLERANCE);
        assert_eq!(poly.degree(), 2);
    }

    #[test]
    fn test_fit_least_squares_on_noisy_line() {
        // Symmetric noise around y = 0.5 averages out.
        let pairs = [(0.0, 0.4), (0.25, 0.6), (0.5, 0.4), (0.75, 0.6), (1.0, 0.4), (0.5, 0.6)];
        let poly = fit_quadratic(&pairs).unwrap();
        let mean_residual: f64 =
            pairs.iter().map(|&(x, y)| y - poly.eval(x)).sum::<f64>() / pairs.len() as f64;

        assert!(mean_residual.abs() < 1e-9, "least squares residuals sum to zero");
    }

    #[test]
    fn test_fit_rejects_too_few_points() {
        let err = fit_quadratic(&[(0.1, 0.1), (0.2, 0.2)]).unwrap_err();
        assert!(matches!(err, Error::Fit(_)));
    }

    #[test]
    fn test_fit_rejects_singular_system() {
        // All x identical: x², x and 1 columns are collinear.
        let err = fit_quadratic(&[(0.5, 0.1), (0.5, 0.2), (0.5, 0.3), (0.5, 0.4)]).unwrap_err();
        assert!(matches!(err, Error::Fit(_)));
    }

    #[test]
    fn test_fit_linear() {
        let poly = fit_linear(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)]).unwrap();
        assert!((poly.coefficients[0] - 2.0).abs() < TOLERANCE);
        assert!((poly.coefficients[1] - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_linspace_endpoints() {
        let xs: Vec<f64> = linspace(0.0, 1.0, 5).collect();
        assert_eq!(xs, vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        let single: Vec<f64> = linspace(0.0, 1.0, 1).collect();
        assert_eq!(single, vec![0.0]);

        assert_eq!(linspace(0.0, 1.0, 0).count(), 0);
    }

    #[test]
    fn test_trajectory_skips_incomplete_tracks() {
        let mut tracks = pool_from(&[(0.0, 0.0), (0.5, 0.25), (1.0, 1.0)]).into_tracks();
        let mut broken = Track::with_point("broken", Feature::Energy, 0.9, Feature::Danceability, 0.0);
        broken.features.danceability = None;
        tracks.push(broken);
        let pool = Pool::new(tracks);

        let points = fit_trajectory(&pool, Feature::Energy, Feature::Danceability, 3).unwrap();

        assert_eq!(points.len(), 3);
        assert!((points[1].x - 0.5).abs() < TOLERANCE);
        assert!((points[1].y - 0.25).abs() < TOLERANCE);
        assert!((points[2].y - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_trajectory_is_increasing_in_x() {
        let pool = pool_from(&[(0.1, 0.3), (0.4, 0.5), (0.6, 0.4), (0.9, 0.8), (0.3, 0.2)]);
        let points = fit_trajectory(&pool, Feature::Energy, Feature::Danceability, 50).unwrap();

        assert_eq!(points.len(), 50);
        assert!(points.windows(2).all(|w| w[0].x < w[1].x));
        assert_eq!(points[0].x, 0.0);
        assert_eq!(points[49].x, 1.0);
    }

    #[test]
    fn test_distance_is_euclidean() {
        let point = TrajectoryPoint::new(0.0, 0.0);
        assert!((point.distance_to(0.3, 0.4) - 0.5).abs() < TOLERANCE);
    }
}
