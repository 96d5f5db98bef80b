//! Pearson and Spearman correlation.

use serde::{Deserialize, Serialize};

use super::distributions::t_two_sided_p;

/// A correlation coefficient with its two-sided significance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationTest {
    pub coefficient: f64,
    pub p_value: f64,
}

/// Ranks starting at 1, ties receive the average of the ranks they span.
pub fn rank_average(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // positions i..=j share rank average of (i+1)..=(j+1)
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

/// Pearson product-moment correlation.
///
/// Returns None for mismatched lengths, fewer than 2 points, or a constant input.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n != y.len() || n < 2 {
        return None;
    }
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Spearman rank correlation with a t-approximation p-value (df = n - 2).
///
/// Returns None when the coefficient is undefined (constant input, fewer than
/// 3 points, mismatched lengths).
pub fn spearman(x: &[f64], y: &[f64]) -> Option<CorrelationTest> {
    let n = x.len();
    if n != y.len() || n < 3 {
        return None;
    }
    let rho = pearson(&rank_average(x), &rank_average(y))?;

    let df = (n - 2) as f64;
    let p_value = if (1.0 - rho.abs()) < 1e-15 {
        0.0
    } else {
        let t = rho * (df / ((1.0 - rho) * (1.0 + rho))).sqrt();
        t_two_sided_p(t, df)
    };

    Some(CorrelationTest {
        coefficient: rho,
        p_value,
    })
}

/// Pearson correlation matrix over equally long columns.
///
/// Undefined entries (constant columns) are NaN; the diagonal is 1.
pub fn correlation_matrix(columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let k = columns.len();
    let mut out = vec![vec![f64::NAN; k]; k];
    for i in 0..k {
        out[i][i] = 1.0;
        for j in (i + 1)..k {
            let r = pearson(&columns[i], &columns[j]).unwrap_or(f64::NAN);
            out[i][j] = r;
            out[j][i] = r;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_average_ties() {
        let r = rank_average(&[10.0, 20.0, 10.0, 30.0]);
        assert_eq!(r, vec![1.5, 3.0, 1.5, 4.0]);
    }

    #[test]
    fn pearson_perfect_and_constant() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson(&x, &y).unwrap() - 1.0).abs() < 1e-12);
        assert!(pearson(&x, &[1.0; 4]).is_none());
    }

    #[test]
    fn spearman_monotone_is_one() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 4.0, 9.0, 16.0, 25.0];
        let r = spearman(&x, &y).unwrap();
        assert!((r.coefficient - 1.0).abs() < 1e-12);
        assert_eq!(r.p_value, 0.0);
    }

    #[test]
    fn spearman_reference_value() {
        // scipy.stats.spearmanr([1,2,3,4,5], [5,6,7,8,7]) → 0.8207826816681233, p=0.0885870
        let r = spearman(&[1.0, 2.0, 3.0, 4.0, 5.0], &[5.0, 6.0, 7.0, 8.0, 7.0]).unwrap();
        assert!((r.coefficient - 0.820_782_681_668).abs() < 1e-9);
        assert!((r.p_value - 0.088_587).abs() < 1e-4);
    }

    #[test]
    fn correlation_matrix_is_symmetric() {
        let cols = vec![vec![1.0, 2.0, 3.0], vec![3.0, 1.0, 2.0], vec![2.0, 4.0, 7.0]];
        let m = correlation_matrix(&cols);
        for i in 0..3 {
            assert_eq!(m[i][i], 1.0);
            for j in 0..3 {
                assert_eq!(m[i][j], m[j][i]);
            }
        }
    }
}
