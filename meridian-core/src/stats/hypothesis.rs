//! Two-sample mean comparison.

use serde::{Deserialize, Serialize};

use super::descriptive::{mean, variance};
use super::distributions::t_two_sided_p;

/// Which variance assumption the two-sample t-test makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TTestKind {
    /// Pooled variance, df = n1 + n2 - 2.
    #[default]
    Student,
    /// Unequal variances, Welch–Satterthwaite df.
    Welch,
}

/// Result of a two-sided two-sample t-test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTestResult {
    /// (mean_a - mean_b) / standard error.
    pub t_statistic: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    pub df: f64,
}

/// Two-sided two-sample t-test, H0: mean(a) == mean(b).
///
/// Returns None if either sample has fewer than 2 values. When both samples
/// have zero variance the statistic is 0 (p = 1) for equal means and
/// infinite (p = 0) otherwise.
pub fn two_sample_t_test(a: &[f64], b: &[f64], kind: TTestKind) -> Option<TTestResult> {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return None;
    }

    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let (m1, m2) = (mean(a), mean(b));
    let (v1, v2) = (variance(a, 1), variance(b, 1));

    let (std_err, df) = match kind {
        TTestKind::Student => {
            let pooled = ((n1f - 1.0) * v1 + (n2f - 1.0) * v2) / (n1f + n2f - 2.0);
            ((pooled * (1.0 / n1f + 1.0 / n2f)).sqrt(), n1f + n2f - 2.0)
        }
        TTestKind::Welch => {
            let s1 = v1 / n1f;
            let s2 = v2 / n2f;
            let se2 = s1 + s2;
            let denom = s1 * s1 / (n1f - 1.0) + s2 * s2 / (n2f - 1.0);
            let df = if denom > 0.0 {
                se2 * se2 / denom
            } else {
                n1f + n2f - 2.0
            };
            (se2.sqrt(), df)
        }
    };

    let diff = m1 - m2;
    if std_err < 1e-15 {
        let (t_statistic, p_value) = if diff.abs() < 1e-15 {
            (0.0, 1.0)
        } else {
            (diff.signum() * f64::INFINITY, 0.0)
        };
        return Some(TTestResult {
            t_statistic,
            p_value,
            df,
        });
    }

    let t_statistic = diff / std_err;
    Some(TTestResult {
        t_statistic,
        p_value: t_two_sided_p(t_statistic, df),
        df,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_matches_reference() {
        // scipy.stats.ttest_ind([1,2,3,4,5], [2,4,6,8,10]) → t=-1.8974, p=0.0943
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let r = two_sample_t_test(&a, &b, TTestKind::Student).unwrap();
        assert!((r.t_statistic + 1.897_366).abs() < 1e-5);
        assert!((r.p_value - 0.094_3).abs() < 1e-3);
        assert_eq!(r.df, 8.0);
    }

    #[test]
    fn welch_has_smaller_df_for_unequal_variance() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let r = two_sample_t_test(&a, &b, TTestKind::Welch).unwrap();
        assert!(r.df < 8.0);
        assert!((r.t_statistic + 1.897_366).abs() < 1e-5);
    }

    #[test]
    fn too_few_observations() {
        assert!(two_sample_t_test(&[1.0], &[1.0, 2.0], TTestKind::Student).is_none());
    }

    #[test]
    fn identical_constant_samples_are_not_significant() {
        let r = two_sample_t_test(&[5.0; 4], &[5.0; 6], TTestKind::Student).unwrap();
        assert_eq!(r.t_statistic, 0.0);
        assert_eq!(r.p_value, 1.0);
    }
}
