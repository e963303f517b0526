//! Curve smoothing: fit a parametric cubic smoothing spline to a raw
//! path and resample it densely.
//!
//! Each point is parameterized by its normalized cumulative chord
//! length, so `t` runs from 0.0 at the first point to 1.0 at the last.
//! Both coordinates are fitted as natural cubic smoothing splines over
//! that shared parameter with one common penalty weight `alpha`:
//!
//! ```text
//! minimize  sum |p_i - g(t_i)|^2  +  alpha * integral |g''(t)|^2 dt
//! ```
//!
//! The weight is chosen so that the residual (summed over both
//! coordinates) equals the smoothing factor `s`, within a relative
//! tolerance of [`RESIDUAL_TOLERANCE`]. `s = 0` interpolates exactly.
//!
//! The smoothest candidate is a single least-squares cubic polynomial in
//! `t` per coordinate. When its residual is already within `s` it is used
//! as is, so any four-point path is interpolated exactly. Otherwise the
//! penalized spline is searched, whose residual ranges from 0 up to that
//! of the least-squares line and so always brackets `s`.
//!
//! For a given `alpha`, the second derivatives at the interior knots
//! solve the pentadiagonal system `(R + alpha Q'Q) gamma = Q'y` (Reinsch's
//! algorithm), which is factored with a banded LDL' decomposition.
//!
//! Smoothing is cosmetic. Paths that cannot be fitted are returned
//! unchanged and the reason is reported through [`Smoothed::Fallback`].

use crate::types::{Point, Polyline};

/// Paths shorter than this are passed through untouched.
pub const MIN_FIT_POINTS: usize = 4;

/// A fitted path is resampled at this many times its input length.
pub const RESAMPLE_FACTOR: usize = 2;

/// Relative tolerance on the residual when searching for the penalty weight.
pub const RESIDUAL_TOLERANCE: f64 = 1e-3;

/// Decades searched in each direction when bracketing the penalty weight.
const MAX_BRACKET_STEPS: usize = 40;

/// Bisection steps in log space once the weight is bracketed.
const MAX_BISECTIONS: usize = 100;

/// Why a path could not be fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FitError {
    /// The smoothing factor is negative or not finite.
    #[error("smoothing factor must be finite and non-negative")]
    InvalidSmoothing,

    /// A coordinate is NaN or infinite.
    #[error("path contains a non-finite coordinate")]
    NonFinite,

    /// Two consecutive points coincide, so the chord parameter stalls.
    #[error("points {index} and {} coincide", index + 1)]
    DuplicatePoint {
        /// Index of the first of the two coincident points.
        index: usize,
    },

    /// The banded system lost positive definiteness.
    #[error("spline system is singular")]
    Singular,

    /// No penalty weight could be bracketed.
    #[error("smoothing weight search did not converge")]
    NoConvergence,

    /// The fitted spline evaluated to a non-finite value.
    #[error("fitted curve is not finite")]
    NonFiniteResult,
}

/// Outcome of smoothing one path.
#[derive(Debug, Clone, PartialEq)]
pub enum Smoothed {
    /// Too short to fit; returned as is.
    Unchanged(Polyline),
    /// Fitted and resampled to [`RESAMPLE_FACTOR`] times the input length.
    Fitted(Polyline),
    /// Fitting failed; the original path is kept.
    Fallback {
        /// The unmodified input path.
        path: Polyline,
        /// Why fitting failed.
        reason: FitError,
    },
}

impl Smoothed {
    /// The path to draw, whatever the outcome.
    #[must_use]
    pub fn into_polyline(self) -> Polyline {
        match self {
            Self::Unchanged(path) | Self::Fitted(path) | Self::Fallback { path, .. } => path,
        }
    }

    /// Borrow the path to draw.
    #[must_use]
    pub const fn polyline(&self) -> &Polyline {
        match self {
            Self::Unchanged(path) | Self::Fitted(path) | Self::Fallback { path, .. } => path,
        }
    }

    /// Returns `true` if fitting was attempted and failed.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Smooth a path, always returning something drawable.
///
/// Paths of fewer than [`MIN_FIT_POINTS`] points come back unchanged.
/// Longer paths are fitted and resampled at
/// `RESAMPLE_FACTOR * path.len()` evenly spaced parameter values, or
/// returned unchanged if fitting fails.
///
/// # Examples
///
/// ```
/// use edgeline_pipeline::{Point, Polyline, smooth::smooth};
///
/// let line = Polyline::new((0..5).map(|i| Point::new(f64::from(i), f64::from(i))).collect());
/// let smoothed = smooth(&line, 1.0);
/// assert_eq!(smoothed.len(), 10);
/// ```
#[must_use = "returns the smoothed polyline"]
pub fn smooth(path: &Polyline, smoothing_factor: f64) -> Polyline {
    smooth_outcome(path, smoothing_factor).into_polyline()
}

/// Smooth a path and report how it went.
#[must_use = "returns the smoothing outcome"]
pub fn smooth_outcome(path: &Polyline, smoothing_factor: f64) -> Smoothed {
    if path.len() < MIN_FIT_POINTS {
        return Smoothed::Unchanged(path.clone());
    }

    match fit(path.points(), smoothing_factor)
        .and_then(|curve| curve.resample(path.len() * RESAMPLE_FACTOR))
    {
        Ok(points) => Smoothed::Fitted(Polyline::new(points)),
        Err(reason) => {
            tracing::trace!(%reason, points = path.len(), "smoothing fell back to raw path");
            Smoothed::Fallback {
                path: path.clone(),
                reason,
            }
        }
    }
}

/// Smooth every path independently.
#[must_use = "returns the smoothing outcomes"]
pub fn smooth_paths(paths: &[Polyline], smoothing_factor: f64) -> Vec<Smoothed> {
    paths
        .iter()
        .map(|p| smooth_outcome(p, smoothing_factor))
        .collect()
}

/// Natural cubic spline through both coordinates over a shared parameter.
#[derive(Debug, Clone)]
struct ParametricSpline {
    knots: Vec<f64>,
    /// Fitted values at the knots, `[x, y]`.
    values: [Vec<f64>; 2],
    /// Second derivatives at the knots (zero at both ends), `[x, y]`.
    second: [Vec<f64>; 2],
    /// Sum of squared distances from the input points to the fitted values.
    residual: f64,
}

impl ParametricSpline {
    fn eval(&self, t: f64) -> Point {
        let last = self.knots.len() - 2;
        let i = self
            .knots
            .partition_point(|&k| k <= t)
            .saturating_sub(1)
            .min(last);
        let (t0, t1) = (self.knots[i], self.knots[i + 1]);
        let h = t1 - t0;
        let a = t - t0;
        let b = t1 - t;

        let coord = |c: usize| {
            let g = &self.values[c];
            let gamma = &self.second[c];
            let linear = a.mul_add(g[i + 1], b * g[i]) / h;
            let curvature = (1.0 + a / h).mul_add(gamma[i + 1], (1.0 + b / h) * gamma[i]);
            linear - a * b * curvature / 6.0
        };
        Point::new(coord(0), coord(1))
    }

}

/// One cubic polynomial per coordinate over the whole parameter range.
///
/// Coefficients are in powers of `u = 2t - 1`, which keeps the normal
/// equations well conditioned on `[0, 1]`.
#[derive(Debug, Clone)]
struct CubicPolynomial {
    /// `[x, y]` coefficients, constant term first.
    coeffs: [[f64; 4]; 2],
    /// Sum of squared distances from the input points to the curve.
    residual: f64,
}

impl CubicPolynomial {
    /// Least-squares fit of both coordinates at the given parameters.
    fn fit(knots: &[f64], coords: &[Vec<f64>; 2]) -> Result<Self, FitError> {
        let u: Vec<f64> = knots.iter().map(|t| 2.0_f64.mul_add(*t, -1.0)).collect();

        let mut normal = [[0.0; 4]; 4];
        for &v in &u {
            let pw = powers(v);
            for (row, &pi) in normal.iter_mut().zip(&pw) {
                for (cell, &pj) in row.iter_mut().zip(&pw) {
                    *cell += pi * pj;
                }
            }
        }

        let mut coeffs = [[0.0; 4]; 2];
        let mut residual = 0.0;
        for c in 0..2 {
            let mut rhs = [0.0; 4];
            for (&v, &y) in u.iter().zip(&coords[c]) {
                for (r, p) in rhs.iter_mut().zip(powers(v)) {
                    *r += p * y;
                }
            }
            coeffs[c] = solve_4x4(normal, rhs)?;
            residual += u
                .iter()
                .zip(&coords[c])
                .map(|(&v, &y)| {
                    let e = horner(&coeffs[c], v) - y;
                    e * e
                })
                .sum::<f64>();
        }

        if !residual.is_finite() {
            return Err(FitError::NonFiniteResult);
        }
        Ok(Self { coeffs, residual })
    }

    fn eval(&self, t: f64) -> Point {
        let u = 2.0_f64.mul_add(t, -1.0);
        Point::new(horner(&self.coeffs[0], u), horner(&self.coeffs[1], u))
    }
}

const fn powers(v: f64) -> [f64; 4] {
    [1.0, v, v * v, v * v * v]
}

fn horner(c: &[f64; 4], v: f64) -> f64 {
    c[3].mul_add(v, c[2]).mul_add(v, c[1]).mul_add(v, c[0])
}

/// Gaussian elimination with partial pivoting.
fn solve_4x4(mut a: [[f64; 4]; 4], mut b: [f64; 4]) -> Result<[f64; 4], FitError> {
    let scale = a[0][0].abs().max(f64::MIN_POSITIVE);
    for col in 0..4 {
        let pivot = (col..4)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        let magnitude = a[pivot][col].abs();
        if magnitude.is_nan() || magnitude <= f64::EPSILON * scale {
            return Err(FitError::Singular);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..4 {
            let f = a[row][col] / a[col][col];
            for k in col..4 {
                a[row][k] -= f * a[col][k];
            }
            b[row] -= f * b[col];
        }
    }

    let mut x = [0.0; 4];
    for row in (0..4).rev() {
        let tail: f64 = (row + 1..4).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

/// A fitted parametric curve.
#[derive(Debug, Clone)]
enum Curve {
    /// Least-squares cubic; the smoothest candidate.
    Cubic(CubicPolynomial),
    /// Natural cubic smoothing spline.
    Spline(ParametricSpline),
}

impl Curve {
    fn eval(&self, t: f64) -> Point {
        match self {
            Self::Cubic(c) => c.eval(t),
            Self::Spline(s) => s.eval(t),
        }
    }

    const fn residual(&self) -> f64 {
        match self {
            Self::Cubic(c) => c.residual,
            Self::Spline(s) => s.residual,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn resample(&self, count: usize) -> Result<Vec<Point>, FitError> {
        let denom = (count - 1) as f64;
        let points: Vec<Point> = (0..count)
            .map(|k| self.eval(k as f64 / denom))
            .collect();
        if points.iter().all(|p| p.is_finite()) {
            Ok(points)
        } else {
            Err(FitError::NonFiniteResult)
        }
    }
}

/// Fit the smoothest curve whose residual does not exceed `s`.
fn fit(points: &[Point], s: f64) -> Result<Curve, FitError> {
    if !s.is_finite() || s < 0.0 {
        return Err(FitError::InvalidSmoothing);
    }

    let knots = chord_parameters(points)?;
    let h: Vec<f64> = knots.windows(2).map(|w| w[1] - w[0]).collect();
    if let Some(index) = h.iter().position(|&d| d <= 0.0) {
        return Err(FitError::DuplicatePoint { index });
    }

    let coords = [
        points.iter().map(|p| p.x).collect::<Vec<_>>(),
        points.iter().map(|p| p.y).collect::<Vec<_>>(),
    ];

    let cubic = CubicPolynomial::fit(&knots, &coords)?;
    if cubic.residual <= s {
        return Ok(Curve::Cubic(cubic));
    }

    let system = PenalizedSystem::new(&knots, &h, &coords);
    if s == 0.0 {
        return system.fit_at(0.0).map(Curve::Spline);
    }

    let (mut lo, mut hi, mut lo_fit) = system.bracket(s)?;
    for _ in 0..MAX_BISECTIONS {
        let mid = (lo * hi).sqrt();
        let candidate = system.fit_at(mid)?;
        if (candidate.residual - s).abs() <= RESIDUAL_TOLERANCE * s {
            return Ok(Curve::Spline(candidate));
        }
        if candidate.residual < s {
            lo = mid;
            lo_fit = candidate;
        } else {
            hi = mid;
        }
    }
    Ok(Curve::Spline(lo_fit))
}

/// Normalized cumulative chord length of each point.
fn chord_parameters(points: &[Point]) -> Result<Vec<f64>, FitError> {
    if !points.iter().all(|p| p.is_finite()) {
        return Err(FitError::NonFinite);
    }

    let mut cumulative = Vec::with_capacity(points.len());
    let mut total = 0.0;
    cumulative.push(total);
    for (index, pair) in points.windows(2).enumerate() {
        let d = pair[0].distance(pair[1]);
        if d == 0.0 {
            return Err(FitError::DuplicatePoint { index });
        }
        total += d;
        cumulative.push(total);
    }

    Ok(cumulative.into_iter().map(|c| c / total).collect())
}

/// The Reinsch system for one knot sequence, shared by both coordinates.
struct PenalizedSystem<'a> {
    knots: &'a [f64],
    h: &'a [f64],
    coords: &'a [Vec<f64>; 2],
    /// `Q'y` for each coordinate.
    rhs: [Vec<f64>; 2],
    /// Bands of `R`: diagonal and first off-diagonal.
    r: [Vec<f64>; 2],
    /// Bands of `Q'Q`: diagonal, first and second off-diagonals.
    qtq: [Vec<f64>; 3],
}

impl<'a> PenalizedSystem<'a> {
    fn new(knots: &'a [f64], h: &'a [f64], coords: &'a [Vec<f64>; 2]) -> Self {
        let m = h.len() - 1;
        let col = |k: usize| q_column(h, k);

        let r0 = (0..m).map(|k| (h[k] + h[k + 1]) / 3.0).collect();
        let r1 = (0..m.saturating_sub(1)).map(|k| h[k + 1] / 6.0).collect();

        let q0 = (0..m)
            .map(|k| {
                let (a, b, c) = col(k);
                c.mul_add(c, a.mul_add(a, b * b))
            })
            .collect();
        let q1 = (0..m.saturating_sub(1))
            .map(|k| {
                let (_, b, c) = col(k);
                let (a1, b1, _) = col(k + 1);
                b.mul_add(a1, c * b1)
            })
            .collect();
        let q2 = (0..m.saturating_sub(2))
            .map(|k| col(k).2 * col(k + 2).0)
            .collect();

        let qt_mul = |y: &[f64]| -> Vec<f64> {
            (0..m)
                .map(|k| (y[k + 2] - y[k + 1]) / h[k + 1] - (y[k + 1] - y[k]) / h[k])
                .collect()
        };

        Self {
            knots,
            h,
            coords,
            rhs: [qt_mul(&coords[0]), qt_mul(&coords[1])],
            r: [r0, r1],
            qtq: [q0, q1, q2],
        }
    }

    /// Solve for the smoothing spline with penalty weight `alpha`.
    fn fit_at(&self, alpha: f64) -> Result<ParametricSpline, FitError> {
        let d0: Vec<f64> = self.r[0]
            .iter()
            .zip(&self.qtq[0])
            .map(|(r, q)| alpha.mul_add(*q, *r))
            .collect();
        let d1: Vec<f64> = self.r[1]
            .iter()
            .zip(&self.qtq[1])
            .map(|(r, q)| alpha.mul_add(*q, *r))
            .collect();
        let d2: Vec<f64> = self.qtq[2].iter().map(|q| alpha * q).collect();
        let ldl = BandedLdl::factor(&d0, &d1, &d2)?;

        let mut residual = 0.0;
        let mut values: [Vec<f64>; 2] = [Vec::new(), Vec::new()];
        let mut second: [Vec<f64>; 2] = [Vec::new(), Vec::new()];
        for c in 0..2 {
            let gamma = ldl.solve(&self.rhs[c]);
            let correction = self.q_mul(&gamma);
            values[c] = self.coords[c]
                .iter()
                .zip(&correction)
                .map(|(y, e)| alpha.mul_add(-e, *y))
                .collect();
            residual += correction
                .iter()
                .map(|e| (alpha * e) * (alpha * e))
                .sum::<f64>();

            let mut full = Vec::with_capacity(gamma.len() + 2);
            full.push(0.0);
            full.extend_from_slice(&gamma);
            full.push(0.0);
            second[c] = full;
        }

        if !residual.is_finite() || values.iter().flatten().any(|v| !v.is_finite()) {
            return Err(FitError::NonFiniteResult);
        }

        Ok(ParametricSpline {
            knots: self.knots.to_vec(),
            values,
            second,
            residual,
        })
    }

    /// Find `lo < hi` with `residual(lo) < s <= residual(hi)`.
    ///
    /// Starts from `alpha = mean(h)^3`, where the roughness penalty and the
    /// residual are of comparable size, and steps by decades.
    fn bracket(&self, s: f64) -> Result<(f64, f64, ParametricSpline), FitError> {
        #[allow(clippy::cast_precision_loss)]
        let mean_h = self.h.iter().sum::<f64>() / self.h.len() as f64;
        let mut alpha = mean_h.powi(3);
        let start = self.fit_at(alpha)?;

        if start.residual < s {
            let mut below = (alpha, start);
            for _ in 0..MAX_BRACKET_STEPS {
                alpha *= 10.0;
                let candidate = self.fit_at(alpha)?;
                if candidate.residual >= s {
                    return Ok((below.0, alpha, below.1));
                }
                below = (alpha, candidate);
            }
        } else {
            let mut above = alpha;
            for _ in 0..MAX_BRACKET_STEPS {
                alpha /= 10.0;
                let candidate = self.fit_at(alpha)?;
                if candidate.residual < s {
                    return Ok((alpha, above, candidate));
                }
                above = alpha;
            }
        }
        Err(FitError::NoConvergence)
    }

    /// `Q gamma` for interior second derivatives `gamma`.
    fn q_mul(&self, gamma: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.knots.len()];
        for (k, g) in gamma.iter().enumerate() {
            let (a, b, c) = q_column(self.h, k);
            out[k] += a * g;
            out[k + 1] += b * g;
            out[k + 2] += c * g;
        }
        out
    }
}

/// Nonzero entries of column `k` of `Q` (rows `k`, `k + 1`, `k + 2`).
fn q_column(h: &[f64], k: usize) -> (f64, f64, f64) {
    let a = 1.0 / h[k];
    let c = 1.0 / h[k + 1];
    (a, -a - c, c)
}

/// LDL' factorization of a symmetric positive definite pentadiagonal matrix.
#[derive(Debug)]
struct BandedLdl {
    d: Vec<f64>,
    l1: Vec<f64>,
    l2: Vec<f64>,
}

impl BandedLdl {
    /// Factor the matrix given by its diagonal and two sub-diagonals.
    fn factor(diag: &[f64], sub1: &[f64], sub2: &[f64]) -> Result<Self, FitError> {
        let m = diag.len();
        let mut d = vec![0.0; m];
        let mut l1 = vec![0.0; m.saturating_sub(1)];
        let mut l2 = vec![0.0; m.saturating_sub(2)];

        for i in 0..m {
            let mut di = diag[i];
            if i >= 1 {
                di -= l1[i - 1] * l1[i - 1] * d[i - 1];
            }
            if i >= 2 {
                di -= l2[i - 2] * l2[i - 2] * d[i - 2];
            }
            if !(di.is_finite() && di > 0.0) {
                return Err(FitError::Singular);
            }
            d[i] = di;

            if i + 1 < m {
                let mut v = sub1[i];
                if i >= 1 {
                    v -= l2[i - 1] * l1[i - 1] * d[i - 1];
                }
                l1[i] = v / di;
            }
            if i + 2 < m {
                l2[i] = sub2[i] / di;
            }
        }

        Ok(Self { d, l1, l2 })
    }

    fn solve(&self, b: &[f64]) -> Vec<f64> {
        let m = self.d.len();
        let mut x = b.to_vec();
        for i in 0..m {
            if i >= 1 {
                x[i] -= self.l1[i - 1] * x[i - 1];
            }
            if i >= 2 {
                x[i] -= self.l2[i - 2] * x[i - 2];
            }
        }
        for i in 0..m {
            x[i] /= self.d[i];
        }
        for i in (0..m).rev() {
            if i + 1 < m {
                x[i] -= self.l1[i] * x[i + 1];
            }
            if i + 2 < m {
                x[i] -= self.l2[i] * x[i + 2];
            }
        }
        x
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn polyline(coords: &[(f64, f64)]) -> Polyline {
        Polyline::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    fn zigzag() -> Polyline {
        polyline(&[
            (0.0, 0.0),
            (1.0, 2.0),
            (2.0, 0.0),
            (3.0, 2.0),
            (4.0, 0.0),
            (5.0, 2.0),
            (6.0, 0.0),
        ])
    }

    // --- Pass-through ---

    #[test]
    fn short_paths_pass_through_unchanged() {
        for len in 0..MIN_FIT_POINTS {
            let pl = Polyline::new(
                (0..len)
                    .map(|i| {
                        #[allow(clippy::cast_precision_loss)]
                        let v = i as f64;
                        Point::new(v, v * v)
                    })
                    .collect(),
            );
            let outcome = smooth_outcome(&pl, 1.0);
            assert_eq!(outcome, Smoothed::Unchanged(pl.clone()));
            assert_eq!(smooth(&pl, 1.0), pl);
        }
    }

    // --- Successful fits ---

    #[test]
    fn diagonal_line_resamples_along_line() {
        let pl = polyline(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0)]);
        let outcome = smooth_outcome(&pl, 1.0);
        assert!(matches!(outcome, Smoothed::Fitted(_)));
        let out = outcome.into_polyline();
        assert_eq!(out.len(), 10);
        for p in out.points() {
            assert!((p.x - p.y).abs() < 1e-9, "({}, {}) is off the line", p.x, p.y);
        }
        let first = out.first().unwrap();
        let last = out.last().unwrap();
        assert!(first.distance(Point::new(0.0, 0.0)) < 1e-9);
        assert!(last.distance(Point::new(4.0, 4.0)) < 1e-9);
    }

    #[test]
    fn resampled_points_are_evenly_spaced_on_a_straight_line() {
        let pl = polyline(&[(0.0, 0.0), (3.0, 0.0), (6.0, 0.0), (9.0, 0.0)]);
        let out = smooth(&pl, 1.0);
        assert_eq!(out.len(), 8);
        for (k, p) in out.points().iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let expected = 9.0 * k as f64 / 7.0;
            assert!((p.x - expected).abs() < 1e-9);
            assert!(p.y.abs() < 1e-9);
        }
    }

    #[test]
    fn four_point_corner_is_interpolated() {
        let pl = polyline(&[(0.0, 0.0), (1.0, 0.0), (2.0, 1.0), (2.0, 2.0)]);
        let curve = fit(pl.points(), 1.0).unwrap();
        assert!(matches!(curve, Curve::Cubic(_)));
        assert!(curve.residual() < 1e-12);
        let knots = chord_parameters(pl.points()).unwrap();
        for (t, p) in knots.iter().zip(pl.points()) {
            let q = curve.eval(*t);
            assert!(q.distance(*p) < 1e-9, "curve misses ({}, {})", p.x, p.y);
        }

        let out = smooth(&pl, 1.0);
        assert_eq!(out.len(), 8);
        assert!(out.first().unwrap().distance(Point::new(0.0, 0.0)) < 1e-9);
        assert!(out.last().unwrap().distance(Point::new(2.0, 2.0)) < 1e-9);
    }

    #[test]
    fn zero_smoothing_interpolates_input_points() {
        let pl = zigzag();
        let curve = fit(pl.points(), 0.0).unwrap();
        assert!(curve.residual().abs() < 1e-12);
        let knots = chord_parameters(pl.points()).unwrap();
        for (t, p) in knots.iter().zip(pl.points()) {
            let q = curve.eval(*t);
            assert!(q.distance(*p) < 1e-9, "spline misses ({}, {})", p.x, p.y);
        }
    }

    #[test]
    fn residual_matches_smoothing_factor() {
        let pl = zigzag();
        let curve = fit(pl.points(), 1.0).unwrap();
        assert!(matches!(curve, Curve::Spline(_)));
        let residual = curve.residual();
        assert!(
            residual <= 1.0 + RESIDUAL_TOLERANCE + 1e-12,
            "residual {residual} exceeds budget"
        );
        assert!(residual > 0.5, "residual {residual} far below budget");
    }

    #[test]
    fn larger_smoothing_departs_further() {
        let pl = zigzag();
        let tight = fit(pl.points(), 0.5).unwrap();
        let loose = fit(pl.points(), 2.0).unwrap();
        assert!(loose.residual() > tight.residual());
    }

    #[test]
    fn huge_smoothing_collapses_to_least_squares_cubic() {
        let pl = zigzag();
        let curve = fit(pl.points(), 1e6).unwrap();
        assert!(matches!(curve, Curve::Cubic(_)));
        // x is linear in t and exact; y leaves 128/21 unexplained.
        assert!((curve.residual() - 128.0 / 21.0).abs() < 1e-9);
        assert_eq!(smooth(&pl, 1e6).len(), 14);
    }

    #[test]
    fn solve_4x4_rejects_singular_matrix() {
        let a = [[1.0, 2.0, 0.0, 0.0], [2.0, 4.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0], [0.0, 0.0, 0.0, 1.0]];
        assert!(matches!(solve_4x4(a, [1.0; 4]), Err(FitError::Singular)));
    }

    #[test]
    fn fitted_output_doubles_length() {
        let pl = zigzag();
        let outcome = smooth_outcome(&pl, 1.0);
        assert!(matches!(outcome, Smoothed::Fitted(_)));
        assert_eq!(outcome.polyline().len(), 2 * pl.len());
    }

    #[test]
    fn closed_ring_is_fitted() {
        // A traced ring whose ends are neighbors but not identical.
        let pl = polyline(&[
            (1.0, 0.0),
            (2.0, 0.0),
            (3.0, 1.0),
            (3.0, 2.0),
            (2.0, 3.0),
            (1.0, 3.0),
            (0.0, 2.0),
            (0.0, 1.0),
        ]);
        let outcome = smooth_outcome(&pl, 1.0);
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.polyline().len(), 16);
    }

    // --- Fallbacks ---

    #[test]
    fn identical_points_fall_back() {
        let pl = polyline(&[(2.0, 2.0); 6]);
        let outcome = smooth_outcome(&pl, 1.0);
        assert_eq!(
            outcome,
            Smoothed::Fallback {
                path: pl.clone(),
                reason: FitError::DuplicatePoint { index: 0 },
            }
        );
        assert_eq!(smooth(&pl, 1.0), pl);
    }

    #[test]
    fn repeated_point_mid_path_falls_back() {
        let pl = polyline(&[(0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        let outcome = smooth_outcome(&pl, 1.0);
        assert!(matches!(
            outcome,
            Smoothed::Fallback {
                reason: FitError::DuplicatePoint { index: 1 },
                ..
            }
        ));
    }

    #[test]
    fn non_finite_point_falls_back() {
        let pl = polyline(&[(0.0, 0.0), (1.0, f64::NAN), (2.0, 0.0), (3.0, 0.0)]);
        let outcome = smooth_outcome(&pl, 1.0);
        assert!(matches!(
            outcome,
            Smoothed::Fallback {
                reason: FitError::NonFinite,
                ..
            }
        ));
        assert_eq!(outcome.polyline().len(), 4);
    }

    #[test]
    fn negative_smoothing_falls_back() {
        let outcome = smooth_outcome(&zigzag(), -1.0);
        assert!(matches!(
            outcome,
            Smoothed::Fallback {
                reason: FitError::InvalidSmoothing,
                ..
            }
        ));
    }

    #[test]
    fn colinear_paths_never_fail() {
        for s in [0.0, 0.5, 1.0, 100.0] {
            let pl = polyline(&[(0.0, 5.0), (1.0, 5.0), (2.0, 5.0), (3.0, 5.0), (7.0, 5.0)]);
            let outcome = smooth_outcome(&pl, s);
            assert!(!outcome.is_fallback(), "s={s} fell back");
            assert!(outcome.polyline().points().iter().all(|p| (p.y - 5.0).abs() < 1e-9));
        }
    }

    #[test]
    fn smooth_paths_keeps_order_and_outcomes() {
        let paths = vec![
            polyline(&[(0.0, 0.0), (1.0, 1.0)]),
            zigzag(),
            polyline(&[(1.0, 1.0); 4]),
        ];
        let outcomes = smooth_paths(&paths, 1.0);
        assert!(matches!(outcomes[0], Smoothed::Unchanged(_)));
        assert!(matches!(outcomes[1], Smoothed::Fitted(_)));
        assert!(outcomes[2].is_fallback());
    }

    // --- Internals ---

    #[test]
    fn chord_parameters_span_unit_interval() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(3.0, 4.0),
            Point::new(3.0, 9.0),
        ];
        let t = chord_parameters(&pts).unwrap();
        assert_eq!(t.len(), 3);
        assert!(t[0].abs() < f64::EPSILON);
        assert!((t[1] - 0.5).abs() < 1e-12);
        assert!((t[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn banded_ldl_solves_pentadiagonal_system() {
        // Symmetric diagonally dominant pentadiagonal matrix.
        let diag = [6.0, 7.0, 8.0, 7.0, 6.0];
        let sub1 = [1.0, -2.0, 1.5, 0.5];
        let sub2 = [0.5, 1.0, -1.0];
        let x = [1.0, -2.0, 3.0, 0.5, -1.5];

        let mut b = [0.0; 5];
        for i in 0..5 {
            b[i] += diag[i] * x[i];
            if i + 1 < 5 {
                b[i] += sub1[i] * x[i + 1];
                b[i + 1] += sub1[i] * x[i];
            }
            if i + 2 < 5 {
                b[i] += sub2[i] * x[i + 2];
                b[i + 2] += sub2[i] * x[i];
            }
        }

        let ldl = BandedLdl::factor(&diag, &sub1, &sub2).unwrap();
        let solved = ldl.solve(&b);
        for (got, want) in solved.iter().zip(x) {
            assert!((got - want).abs() < 1e-10, "got {got}, want {want}");
        }
    }

    #[test]
    fn banded_ldl_rejects_indefinite_matrix() {
        let result = BandedLdl::factor(&[1.0, -1.0], &[0.0], &[]);
        assert!(matches!(result, Err(FitError::Singular)));
    }
}
