//! Small dense linear algebra: Cholesky factorization, SPD solves, OLS.
//!
//! Matrices are row-major `Vec<Vec<f64>>`. Sizes in this crate are tiny
//! (at most a dozen regressors), so clarity beats blocking or SIMD.

use serde::{Deserialize, Serialize};

use crate::stats::StatsError;

/// Lower-triangular Cholesky factor L with A = L Lᵀ.
///
/// Returns `StatsError::Singular` if A is not numerically positive definite.
pub fn cholesky(a: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, StatsError> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];
    let scale = (0..n).map(|i| a[i][i].abs()).fold(0.0_f64, f64::max).max(1.0);

    for i in 0..n {
        if a[i].len() != n {
            return Err(StatsError::DimensionMismatch {
                expected: n,
                got: a[i].len(),
            });
        }
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if !sum.is_finite() || sum <= 1e-13 * scale {
                    return Err(StatsError::Singular);
                }
                l[i][i] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Ok(l)
}

/// Solve A x = b for symmetric positive definite A.
pub fn solve_spd(a: &[Vec<f64>], b: &[f64]) -> Result<Vec<f64>, StatsError> {
    let l = cholesky(a)?;
    Ok(solve_with_factor(&l, b))
}

/// Inverse of a symmetric positive definite matrix.
pub fn invert_spd(a: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, StatsError> {
    let n = a.len();
    let l = cholesky(a)?;
    let mut inv = vec![vec![0.0; n]; n];
    let mut e = vec![0.0; n];
    for col in 0..n {
        e.iter_mut().for_each(|v| *v = 0.0);
        e[col] = 1.0;
        let x = solve_with_factor(&l, &e);
        for row in 0..n {
            inv[row][col] = x[row];
        }
    }
    Ok(inv)
}

/// Forward then backward substitution with a Cholesky factor.
fn solve_with_factor(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = l.len();
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[i][k] * y[k];
        }
        y[i] = sum / l[i][i];
    }
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= l[k][i] * x[k];
        }
        x[i] = sum / l[i][i];
    }
    x
}

/// Lower-triangular matrix times vector.
pub fn lower_mul(l: &[Vec<f64>], z: &[f64]) -> Vec<f64> {
    l.iter()
        .enumerate()
        .map(|(i, row)| row[..=i].iter().zip(&z[..=i]).map(|(a, b)| a * b).sum())
        .collect()
}

/// Ordinary least squares fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OlsFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    pub nobs: usize,
    /// Akaike information criterion: -2 loglik + 2k.
    pub aic: f64,
}

impl OlsFit {
    /// t-value of coefficient `i`.
    pub fn t_value(&self, i: usize) -> f64 {
        self.coefficients[i] / self.std_errors[i]
    }
}

/// OLS of `y` on the regressor rows `x` (each row one observation).
///
/// Solves the normal equations by Cholesky. Requires nobs > k.
pub fn ols(y: &[f64], x: &[Vec<f64>]) -> Result<OlsFit, StatsError> {
    let n = y.len();
    if x.len() != n {
        return Err(StatsError::DimensionMismatch {
            expected: n,
            got: x.len(),
        });
    }
    let k = x.first().map(Vec::len).unwrap_or(0);
    if k == 0 || n <= k {
        return Err(StatsError::InsufficientData {
            needed: k + 1,
            got: n,
        });
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &yi) in x.iter().zip(y) {
        if row.len() != k {
            return Err(StatsError::DimensionMismatch {
                expected: k,
                got: row.len(),
            });
        }
        for i in 0..k {
            xty[i] += row[i] * yi;
            for j in 0..=i {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in (i + 1)..k {
            xtx[i][j] = xtx[j][i];
        }
    }

    let inv = invert_spd(&xtx)?;
    let coefficients: Vec<f64> = (0..k)
        .map(|i| (0..k).map(|j| inv[i][j] * xty[j]).sum())
        .collect();

    let ssr: f64 = x
        .iter()
        .zip(y)
        .map(|(row, &yi)| {
            let fitted: f64 = row.iter().zip(&coefficients).map(|(a, b)| a * b).sum();
            (yi - fitted).powi(2)
        })
        .sum();

    let sigma2 = ssr / (n - k) as f64;
    let std_errors = (0..k).map(|i| (sigma2 * inv[i][i]).sqrt()).collect();

    let nf = n as f64;
    let llf = -nf / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / nf).ln() + 1.0);
    let aic = -2.0 * llf + 2.0 * k as f64;

    Ok(OlsFit {
        coefficients,
        std_errors,
        ssr,
        nobs: n,
        aic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cholesky_reconstructs() {
        let a = vec![
            vec![4.0, 12.0, -16.0],
            vec![12.0, 37.0, -43.0],
            vec![-16.0, -43.0, 98.0],
        ];
        let l = cholesky(&a).unwrap();
        assert_eq!(l[0], vec![2.0, 0.0, 0.0]);
        assert_eq!(l[1], vec![6.0, 1.0, 0.0]);
        assert_eq!(l[2], vec![-8.0, 5.0, 3.0]);
    }

    #[test]
    fn cholesky_rejects_singular() {
        let a = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        assert_eq!(cholesky(&a), Err(StatsError::Singular));
    }

    #[test]
    fn solve_and_invert() {
        let a = vec![vec![4.0, 1.0], vec![1.0, 3.0]];
        let x = solve_spd(&a, &[1.0, 2.0]).unwrap();
        assert!((x[0] - 1.0 / 11.0).abs() < 1e-12);
        assert!((x[1] - 7.0 / 11.0).abs() < 1e-12);

        let inv = invert_spd(&a).unwrap();
        assert!((inv[0][0] - 3.0 / 11.0).abs() < 1e-12);
        assert!((inv[0][1] + 1.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn ols_recovers_exact_line() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![1.0, i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 3.0 + 2.0 * i as f64 + if i % 2 == 0 { 0.01 } else { -0.01 }).collect();
        let fit = ols(&y, &x).unwrap();
        assert!((fit.coefficients[0] - 3.0).abs() < 0.02);
        assert!((fit.coefficients[1] - 2.0).abs() < 0.01);
        assert!(fit.ssr < 0.01);
    }

    #[test]
    fn ols_collinear_is_singular() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![1.0, 2.0 * i as f64, i as f64]).collect();
        let y: Vec<f64> = (0..6).map(f64::from).collect();
        assert_eq!(ols(&y, &x).unwrap_err(), StatsError::Singular);
    }
}
