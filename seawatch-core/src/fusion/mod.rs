//! Track Estimation Framework
//!
//! Every vessel track carries its own constant-velocity Kalman filter. The
//! filter state lives in a local east/north tangent plane (metres) anchored
//! near the vessel, so the dynamics stay linear and the matrices stay small:
//!
//! ```text
//! AIS   ──┐
//! RADAR ──┼─→ project to local plane ─→ TrackFilter ─→ fused state
//! GNSS  ──┘                                   ↓
//!                                      innovation + covariance
//! ```
//!
//! One predict/correct cycle:
//!
//! ```text
//! State Prediction:    x̂ₖ = F(dt)·xₖ₋₁
//! Covariance Predict:  Pₖ = F·Pₖ₋₁·Fᵀ + Q(dt)
//! Innovation:          yₖ = zₖ - H·x̂ₖ
//! Innovation cov:      Sₖ = H·Pₖ·Hᵀ + R
//! Kalman Gain:         Kₖ = Pₖ·Hᵀ·Sₖ⁻¹
//! State Update:        xₖ = x̂ₖ + Kₖ·yₖ
//! Covariance (Joseph): Pₖ = (I-KH)·Pₖ·(I-KH)ᵀ + K·R·Kᵀ
//! ```
//!
//! Submodules: [`matrix`] (stack linear algebra), [`models`] (motion and
//! per-source noise), [`kalman`] (the per-track filter) and [`confidence`]
//! (the score attached to published tracks).
//!
//! The covariance is symmetrized after each step and updated in Joseph form.
//! A near-singular innovation covariance is regularized with a growing
//! diagonal epsilon rather than failing the update outright.

pub mod kalman;
pub mod confidence;
pub mod models;

pub use kalman::{Innovation, TrackFilter};
pub use confidence::ConfidenceScore;
pub use models::{ConstantVelocityModel, Measurement, NoiseProfile, SourceNoise};

/// Stack-allocated linear algebra for 2x2 and 4x4 filter matrices
///
/// Results are written into caller-provided arrays so a filter step never
/// allocates.
pub mod matrix {
    use crate::constants::fusion::{
        MATRIX_SINGULAR_THRESHOLD, REGULARIZATION_EPSILON_MAX, REGULARIZATION_EPSILON_START,
        REGULARIZATION_GROWTH,
    };

    /// Row-major `R x C` matrix
    pub type Matrix<const R: usize, const C: usize> = [[f64; C]; R];

    /// `N x N` matrix
    pub type SquareMatrix<const N: usize> = Matrix<N, N>;

    /// Column vector of length `N`
    pub type Vector<const N: usize> = [f64; N];

    /// `N x N` identity
    pub fn identity<const N: usize>() -> SquareMatrix<N> {
        core::array::from_fn(|i| core::array::from_fn(|j| if i == j { 1.0 } else { 0.0 }))
    }

    /// `out = a · b`
    pub fn multiply<const R: usize, const K: usize, const C: usize>(
        a: &Matrix<R, K>,
        b: &Matrix<K, C>,
        out: &mut Matrix<R, C>,
    ) {
        for (row, a_row) in out.iter_mut().zip(a) {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = a_row.iter().zip(b).map(|(x, b_row)| x * b_row[c]).sum();
            }
        }
    }

    /// `out = aᵀ`
    pub fn transpose<const R: usize, const C: usize>(a: &Matrix<R, C>, out: &mut Matrix<C, R>) {
        for (r, a_row) in a.iter().enumerate() {
            for (c, value) in a_row.iter().enumerate() {
                out[c][r] = *value;
            }
        }
    }

    /// `out = a + b`
    pub fn add<const R: usize, const C: usize>(
        a: &Matrix<R, C>,
        b: &Matrix<R, C>,
        out: &mut Matrix<R, C>,
    ) {
        for ((row, a_row), b_row) in out.iter_mut().zip(a).zip(b) {
            for ((cell, x), y) in row.iter_mut().zip(a_row).zip(b_row) {
                *cell = x + y;
            }
        }
    }

    /// Replace both off-diagonal halves by their mean
    ///
    /// Rounding in `F·P·Fᵀ` leaves the covariance slightly asymmetric; this
    /// runs after every predict and correct.
    pub fn make_symmetric<const N: usize>(m: &mut SquareMatrix<N>) {
        for r in 0..N {
            for c in r + 1..N {
                let mean = 0.5 * (m[r][c] + m[c][r]);
                m[r][c] = mean;
                m[c][r] = mean;
            }
        }
    }

    /// `out = m · v`
    pub fn matvec<const R: usize, const C: usize>(
        m: &Matrix<R, C>,
        v: &Vector<C>,
        out: &mut Vector<R>,
    ) {
        for (cell, row) in out.iter_mut().zip(m) {
            *cell = row.iter().zip(v).map(|(x, y)| x * y).sum();
        }
    }

    /// Mean absolute diagonal, used to scale tolerances
    pub fn diagonal_scale<const N: usize>(matrix: &SquareMatrix<N>) -> f64 {
        if N == 0 {
            return 1.0;
        }
        let sum: f64 = (0..N).map(|i| matrix[i][i].abs()).sum();
        let scale = sum / N as f64;
        if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        }
    }

    /// Lower-triangular factor `l` with `l · lᵀ = a`
    ///
    /// Fails as soon as a pivot is not strictly positive, which is how the
    /// covariance checks detect an indefinite matrix.
    pub fn cholesky<const N: usize>(a: &SquareMatrix<N>, l: &mut SquareMatrix<N>) -> bool {
        *l = [[0.0; N]; N];

        for r in 0..N {
            for c in 0..=r {
                let dot: f64 = (0..c).map(|k| l[r][k] * l[c][k]).sum();
                let residual = a[r][c] - dot;
                if r == c {
                    if !(residual > 0.0) {
                        return false;
                    }
                    l[r][r] = libm::sqrt(residual);
                } else {
                    l[r][c] = residual / l[c][c];
                }
            }
        }

        true
    }

    /// Positive semi-definite check within a relative tolerance
    ///
    /// A tiny diagonal jitter lets exactly-singular but valid covariances
    /// (zero-noise filters) pass the Cholesky test.
    pub fn is_positive_semidefinite<const N: usize>(a: &SquareMatrix<N>) -> bool {
        let jitter = diagonal_scale(a) * 1e-9;
        let mut shifted = *a;
        for (i, row) in shifted.iter_mut().enumerate() {
            row[i] += jitter;
        }
        let mut l = [[0.0; N]; N];
        cholesky(&shifted, &mut l)
    }

    /// Symmetry check within a relative tolerance
    pub fn is_symmetric<const N: usize>(a: &SquareMatrix<N>, tolerance: f64) -> bool {
        let scale = diagonal_scale(a);
        for i in 0..N {
            for j in i + 1..N {
                if (a[i][j] - a[j][i]).abs() > tolerance * scale {
                    return false;
                }
            }
        }
        true
    }

    /// Matrix inversion using Gauss-Jordan elimination with partial pivoting
    ///
    /// Pivots smaller than `MATRIX_SINGULAR_THRESHOLD` relative to the
    /// diagonal scale are treated as singular. Returns false if singular.
    pub fn invert<const N: usize>(a: &SquareMatrix<N>, inv: &mut SquareMatrix<N>) -> bool {
        let threshold = diagonal_scale(a) * MATRIX_SINGULAR_THRESHOLD;
        let mut work = *a;
        *inv = identity();

        for k in 0..N {
            let (pivot_row, pivot_abs) = (k + 1..N).fold((k, work[k][k].abs()), |best, r| {
                let candidate = work[r][k].abs();
                if candidate > best.1 { (r, candidate) } else { best }
            });

            if !(pivot_abs > threshold) {
                return false;
            }

            work.swap(k, pivot_row);
            inv.swap(k, pivot_row);

            let pivot = work[k][k];
            for j in 0..N {
                work[k][j] /= pivot;
                inv[k][j] /= pivot;
            }

            for i in 0..N {
                if i != k {
                    let factor = work[i][k];
                    for j in 0..N {
                        work[i][j] -= factor * work[k][j];
                        inv[i][j] -= factor * inv[k][j];
                    }
                }
            }
        }

        inv.iter().flatten().all(|v| v.is_finite())
    }

    /// Invert, regularizing a near-singular matrix if needed
    ///
    /// Adds `ε · scale` to the diagonal with ε growing from
    /// `REGULARIZATION_EPSILON_START` to `REGULARIZATION_EPSILON_MAX`.
    /// Returns the inverse and the epsilon used (0.0 when none was needed),
    /// or `None` once regularization is exhausted.
    pub fn invert_regularized<const N: usize>(
        a: &SquareMatrix<N>,
    ) -> Option<(SquareMatrix<N>, f64)> {
        let mut inv = [[0.0; N]; N];
        if invert(a, &mut inv) {
            return Some((inv, 0.0));
        }

        let scale = diagonal_scale(a);
        let mut epsilon = REGULARIZATION_EPSILON_START;
        while epsilon <= REGULARIZATION_EPSILON_MAX * (1.0 + 1e-9) {
            let mut shifted = *a;
            for (i, row) in shifted.iter_mut().enumerate() {
                row[i] += epsilon * scale;
            }
            if invert(&shifted, &mut inv) {
                return Some((inv, epsilon));
            }
            epsilon *= REGULARIZATION_GROWTH;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::matrix::*;

    fn assert_close<const N: usize>(a: &SquareMatrix<N>, b: &SquareMatrix<N>, tol: f64) {
        for (ra, rb) in a.iter().zip(b) {
            for (x, y) in ra.iter().zip(rb) {
                assert!((x - y).abs() < tol, "{:?} != {:?}", a, b);
            }
        }
    }

    #[test]
    fn transition_times_covariance() {
        // F for dt = 2 s applied to a diagonal covariance
        let mut f = identity::<4>();
        f[0][2] = 2.0;
        f[1][3] = 2.0;
        let p: SquareMatrix<4> = [
            [25.0, 0.0, 0.0, 0.0],
            [0.0, 25.0, 0.0, 0.0],
            [0.0, 0.0, 4.0, 0.0],
            [0.0, 0.0, 0.0, 4.0],
        ];

        let mut fp = [[0.0; 4]; 4];
        multiply(&f, &p, &mut fp);
        let mut f_t = [[0.0; 4]; 4];
        transpose(&f, &mut f_t);
        let mut fpf_t = [[0.0; 4]; 4];
        multiply(&fp, &f_t, &mut fpf_t);

        assert_eq!(fpf_t[0][0], 25.0 + 4.0 * 4.0);
        assert_eq!(fpf_t[0][2], 8.0);
        assert_eq!(fpf_t[2][0], 8.0);
        assert_eq!(fpf_t[3][3], 4.0);

        let mut v = [0.0; 4];
        matvec(&f, &[100.0, -50.0, 3.0, 1.5], &mut v);
        assert_eq!(v, [106.0, -47.0, 3.0, 1.5]);
    }

    #[test]
    fn rectangular_product_and_sum() {
        let h: Matrix<2, 4> = [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]];
        let mut h_t = [[0.0; 2]; 4];
        transpose(&h, &mut h_t);
        let mut hh_t = [[0.0; 2]; 2];
        multiply(&h, &h_t, &mut hh_t);
        assert_eq!(hh_t, identity::<2>());

        let mut sum = [[0.0; 2]; 2];
        add(&hh_t, &[[9.0, 1.0], [1.0, 9.0]], &mut sum);
        assert_eq!(sum, [[10.0, 1.0], [1.0, 10.0]]);

        let mut lopsided: SquareMatrix<2> = [[1.0, 0.2], [0.4, 1.0]];
        make_symmetric(&mut lopsided);
        assert_close(&lopsided, &[[1.0, 0.3], [0.3, 1.0]], 1e-15);
    }

    #[test]
    fn innovation_covariance_inverse() {
        let s: SquareMatrix<2> = [[400.0, 120.0], [120.0, 225.0]];
        let mut s_inv = [[0.0; 2]; 2];
        assert!(invert(&s, &mut s_inv));

        let mut product = [[0.0; 2]; 2];
        multiply(&s, &s_inv, &mut product);
        assert_close(&product, &identity(), 1e-12);
    }

    #[test]
    fn pivoting_handles_zero_leading_entry() {
        let a: SquareMatrix<2> = [[0.0, 2.0], [3.0, 0.0]];
        let mut inv = [[0.0; 2]; 2];
        assert!(invert(&a, &mut inv));
        assert_close(&inv, &[[0.0, 1.0 / 3.0], [0.5, 0.0]], 1e-15);
    }

    #[test]
    fn singular_matrix_is_regularized() {
        let singular: SquareMatrix<2> = [[100.0, 100.0], [100.0, 100.0]];
        let mut inv = [[0.0; 2]; 2];
        assert!(!invert(&singular, &mut inv));

        let (inv, epsilon) = invert_regularized(&singular).unwrap();
        assert!(epsilon > 0.0);
        assert!(epsilon <= 1e-3);
        assert!(inv.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn regularization_limits() {
        // Scale falls back to 1.0, so ε·I makes it invertible
        let zero: SquareMatrix<2> = [[0.0; 2]; 2];
        assert!(invert_regularized(&zero).is_some());

        let nan: SquareMatrix<2> = [[f64::NAN, 0.0], [0.0, 1.0]];
        assert!(invert_regularized(&nan).is_none());
    }

    #[test]
    fn cholesky_factor_reproduces_covariance() {
        let p: SquareMatrix<3> = [[9.0, 3.0, 0.0], [3.0, 5.0, 2.0], [0.0, 2.0, 6.0]];
        let mut l = [[0.0; 3]; 3];
        assert!(cholesky(&p, &mut l));
        assert_eq!(l[0][1], 0.0);

        let mut l_t = [[0.0; 3]; 3];
        transpose(&l, &mut l_t);
        let mut back = [[0.0; 3]; 3];
        multiply(&l, &l_t, &mut back);
        assert_close(&back, &p, 1e-9);
    }

    #[test]
    fn psd_and_symmetry_checks() {
        let psd: SquareMatrix<2> = [[2.0, 1.0], [1.0, 2.0]];
        assert!(is_positive_semidefinite(&psd));
        assert!(is_symmetric(&psd, 1e-12));

        let indefinite: SquareMatrix<2> = [[1.0, 3.0], [3.0, 1.0]];
        assert!(!is_positive_semidefinite(&indefinite));

        let skewed: SquareMatrix<2> = [[1.0, 0.5], [0.4, 1.0]];
        assert!(!is_symmetric(&skewed, 1e-6));
    }
}
