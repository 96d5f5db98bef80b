//! Logistic-regression attrition classifier.
//!
//! Features are the top-ranked attrition drivers, standardized on the full
//! table. The data is split 75/25 stratified by class, the model is fitted
//! with balanced class weights and an L2 penalty on the coefficients (the
//! intercept is unpenalized), and evaluated on the held-out rows.
//!
//! Fitting uses Newton's method (IRLS) on
//!
//! ```text
//! ½‖β‖² + C Σ w_i [−y_i log p_i − (1 − y_i) log(1 − p_i)]
//! ```

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::attrition::{feature_values, CorrelationRecord};
use super::table::{EmployeeTable, ATTRITION};
use crate::diagnostics::Diagnostic;
use crate::linalg::solve_spd;
use crate::rng::RngHierarchy;
use crate::stats::{mean, round_to, std_dev, StatsError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub top_features: usize,
    pub test_fraction: f64,
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub balanced: bool,
    pub seed: u64,
    /// Accuracy below this is reported as a warning.
    pub accuracy_warning: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            top_features: 10,
            test_fraction: 0.25,
            c: 1.0,
            max_iterations: 100,
            tolerance: 1e-8,
            balanced: true,
            seed: 42,
            accuracy_warning: 0.70,
        }
    }
}

/// Held-out classification metrics, rounded to 4 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    /// 0 when nothing is predicted positive.
    pub precision: f64,
    /// 0 when the test set has no positives.
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCoefficient {
    pub feature: String,
    /// Coefficient on the standardized feature.
    pub coefficient: f64,
}

/// Fitted classifier and its evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttritionModel {
    pub features: Vec<String>,
    /// Sorted by absolute value, largest first.
    pub coefficients: Vec<FeatureCoefficient>,
    pub intercept: f64,
    pub metrics: ModelMetrics,
    pub train_size: usize,
    pub test_size: usize,
    pub iterations: usize,
}

/// Logistic regression weights: `[intercept, β...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticFit {
    pub weights: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl LogisticFit {
    pub fn decision(&self, x: &[f64]) -> f64 {
        self.weights[0]
            + self.weights[1..]
                .iter()
                .zip(x)
                .map(|(w, v)| w * v)
                .sum::<f64>()
    }

    /// Class 1 when the decision value is positive (p > 0.5).
    pub fn predict(&self, x: &[f64]) -> u8 {
        u8::from(self.decision(x) > 0.0)
    }
}

// ─── Fitting ─────────────────────────────────────────────────────────

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `log(1 + e^z)` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

fn objective(x: &[Vec<f64>], y: &[u8], sw: &[f64], w: &[f64], c: f64) -> f64 {
    let penalty = 0.5 * w[1..].iter().map(|b| b * b).sum::<f64>();
    let loss: f64 = x
        .iter()
        .zip(y)
        .zip(sw)
        .map(|((xi, &yi), s)| {
            let z = w[0] + w[1..].iter().zip(xi).map(|(b, v)| b * v).sum::<f64>();
            // −y log p − (1−y) log(1−p) = softplus(z) − y z
            s * (softplus(z) - f64::from(yi) * z)
        })
        .sum();
    penalty + c * loss
}

/// Fit L2-penalized weighted logistic regression by Newton's method.
pub fn fit_logistic(
    x: &[Vec<f64>],
    y: &[u8],
    sample_weights: &[f64],
    c: f64,
    max_iterations: usize,
    tolerance: f64,
) -> Result<LogisticFit, StatsError> {
    let n = x.len();
    if n == 0 || y.len() != n || sample_weights.len() != n {
        return Err(StatsError::DimensionMismatch {
            expected: n,
            got: y.len().min(sample_weights.len()),
        });
    }
    let k = x[0].len() + 1;
    let mut w = vec![0.0; k];
    let mut current = objective(x, y, sample_weights, &w, c);

    for iteration in 1..=max_iterations {
        let mut grad = vec![0.0; k];
        let mut hess = vec![vec![0.0; k]; k];
        for j in 1..k {
            grad[j] = w[j];
            hess[j][j] = 1.0;
        }
        for ((xi, &yi), &s) in x.iter().zip(y).zip(sample_weights) {
            let z = w[0] + w[1..].iter().zip(xi).map(|(b, v)| b * v).sum::<f64>();
            let p = sigmoid(z);
            let g = c * s * (p - f64::from(yi));
            let h = c * s * p * (1.0 - p);
            let row = |j: usize| if j == 0 { 1.0 } else { xi[j - 1] };
            for a in 0..k {
                grad[a] += g * row(a);
                for b in 0..=a {
                    hess[a][b] += h * row(a) * row(b);
                }
            }
        }
        for a in 0..k {
            for b in (a + 1)..k {
                hess[a][b] = hess[b][a];
            }
        }

        let step = solve_spd(&hess, &grad)?;

        // Backtracking keeps each step a descent step.
        let mut scale = 1.0;
        let mut candidate: Vec<f64>;
        let mut value;
        loop {
            candidate = w.iter().zip(&step).map(|(wi, si)| wi - scale * si).collect();
            value = objective(x, y, sample_weights, &candidate, c);
            if value <= current || scale < 1e-6 {
                break;
            }
            scale *= 0.5;
        }

        let max_change = step.iter().map(|s| (scale * s).abs()).fold(0.0_f64, f64::max);
        w = candidate;
        current = value;
        if max_change < tolerance {
            return Ok(LogisticFit {
                weights: w,
                iterations: iteration,
                converged: true,
            });
        }
    }

    Ok(LogisticFit {
        weights: w,
        iterations: max_iterations,
        converged: false,
    })
}

// ─── Data preparation ────────────────────────────────────────────────

/// Column-wise standardization with the population standard deviation.
/// Constant columns are centered only.
pub fn standardize(columns: &mut [Vec<f64>]) {
    for col in columns.iter_mut() {
        let m = mean(col);
        let s = std_dev(col, 0);
        let s = if s.is_finite() && s > 0.0 { s } else { 1.0 };
        col.iter_mut().for_each(|v| *v = (*v - m) / s);
    }
}

/// Stratified shuffle split. Returns `(train, test)` row indices, each sorted.
///
/// Each class contributes `round(test_fraction · n_class)` test rows, clamped
/// so both sides keep at least one row of the class.
pub fn stratified_split(
    labels: &[u8],
    test_fraction: f64,
    rng: &mut impl rand::Rng,
) -> (Vec<usize>, Vec<usize>) {
    let mut train = Vec::new();
    let mut test = Vec::new();
    for class in [0u8, 1u8] {
        let mut idx: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
        if idx.is_empty() {
            continue;
        }
        idx.shuffle(rng);
        let n_test = ((test_fraction * idx.len() as f64).round() as usize).clamp(
            usize::from(idx.len() > 1),
            idx.len().saturating_sub(1),
        );
        test.extend_from_slice(&idx[..n_test]);
        train.extend_from_slice(&idx[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// `n / (2 · n_class)` per row, so both classes carry equal total weight.
pub fn balanced_weights(labels: &[u8]) -> Vec<f64> {
    let n = labels.len() as f64;
    let positives = labels.iter().filter(|&&l| l == 1).count() as f64;
    let negatives = n - positives;
    labels
        .iter()
        .map(|&l| {
            let count = if l == 1 { positives } else { negatives };
            n / (2.0 * count)
        })
        .collect()
}

/// Accuracy, precision, recall and F1 with zero for undefined ratios.
pub fn classification_metrics(actual: &[u8], predicted: &[u8]) -> ModelMetrics {
    let (mut tp, mut fp, mut fn_, mut correct) = (0usize, 0usize, 0usize, 0usize);
    for (&a, &p) in actual.iter().zip(predicted) {
        match (a, p) {
            (1, 1) => tp += 1,
            (0, 1) => fp += 1,
            (1, 0) => fn_ += 1,
            _ => {}
        }
        if a == p {
            correct += 1;
        }
    }
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ModelMetrics {
        accuracy: round_to(ratio(correct, actual.len()), 4),
        precision: round_to(precision, 4),
        recall: round_to(recall, 4),
        f1: round_to(f1, 4),
    }
}

// ─── Pipeline step ───────────────────────────────────────────────────

/// Train and evaluate the classifier on the top-ranked drivers.
///
/// Skipped with a warning when there is no `Attrition` column, no usable
/// features, only one class, or a class with fewer than 2 rows.
pub fn train_attrition_model(
    table: &EmployeeTable,
    ranked: &[CorrelationRecord],
    config: &ClassifierConfig,
) -> (Option<AttritionModel>, Vec<Diagnostic>) {
    let mut diags = Vec::new();
    let Some(labels) = table.attrition() else {
        diags.push(Diagnostic::warn(format!(
            "Classifier skipped: no {ATTRITION} column"
        )));
        return (None, diags);
    };

    let mut features = Vec::new();
    let mut columns = Vec::new();
    for record in ranked.iter().take(config.top_features) {
        if let Some(values) = feature_values(table, &record.feature) {
            features.push(record.feature.clone());
            columns.push(values);
        }
    }
    if features.is_empty() {
        diags.push(Diagnostic::warn("Classifier skipped: no usable features"));
        return (None, diags);
    }

    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;
    if positives < 2 || negatives < 2 {
        warn!(pipeline = "hr", positives, negatives, "classifier skipped");
        diags.push(Diagnostic::warn(format!(
            "Classifier skipped: need at least 2 rows per class, got {positives} leavers / {negatives} stayers"
        )));
        return (None, diags);
    }

    standardize(&mut columns);
    let rows: Vec<Vec<f64>> = (0..labels.len())
        .map(|i| columns.iter().map(|c| c[i]).collect())
        .collect();

    let mut rng = RngHierarchy::new(config.seed).rng_for("train_split", "attrition");
    let (train, test) = stratified_split(labels, config.test_fraction, &mut rng);

    let x_train: Vec<Vec<f64>> = train.iter().map(|&i| rows[i].clone()).collect();
    let y_train: Vec<u8> = train.iter().map(|&i| labels[i]).collect();
    let sample_weights = if config.balanced {
        balanced_weights(&y_train)
    } else {
        vec![1.0; y_train.len()]
    };

    let fit = match fit_logistic(
        &x_train,
        &y_train,
        &sample_weights,
        config.c,
        config.max_iterations,
        config.tolerance,
    ) {
        Ok(fit) => fit,
        Err(e) => {
            diags.push(Diagnostic::error(format!("Classifier fit failed: {e}")));
            return (None, diags);
        }
    };
    if !fit.converged {
        diags.push(Diagnostic::warn(format!(
            "Classifier did not converge in {} iterations",
            fit.iterations
        )));
    }

    let y_test: Vec<u8> = test.iter().map(|&i| labels[i]).collect();
    let predicted: Vec<u8> = test.iter().map(|&i| fit.predict(&rows[i])).collect();
    let metrics = classification_metrics(&y_test, &predicted);

    info!(
        pipeline = "hr",
        accuracy = metrics.accuracy,
        precision = metrics.precision,
        recall = metrics.recall,
        f1 = metrics.f1,
        "attrition classifier evaluated"
    );
    diags.push(Diagnostic::ok(format!(
        "Logistic regression: accuracy={:.4}, precision={:.4}, recall={:.4}, f1={:.4}",
        metrics.accuracy, metrics.precision, metrics.recall, metrics.f1
    )));
    if metrics.accuracy < config.accuracy_warning {
        diags.push(Diagnostic::warn(format!(
            "Accuracy < {:.0}%. Review features.",
            config.accuracy_warning * 100.0
        )));
    }
    diags.push(Diagnostic::qa(format!(
        "Logistic regression accuracy: {:.2}% ({})",
        metrics.accuracy * 100.0,
        if metrics.accuracy >= config.accuracy_warning {
            "OK"
        } else {
            "WARN"
        }
    )));

    let mut coefficients: Vec<FeatureCoefficient> = features
        .iter()
        .zip(&fit.weights[1..])
        .map(|(f, &c)| FeatureCoefficient {
            feature: f.clone(),
            coefficient: c,
        })
        .collect();
    coefficients.sort_by(|a, b| b.coefficient.abs().total_cmp(&a.coefficient.abs()));

    (
        Some(AttritionModel {
            features,
            coefficients,
            intercept: fit.weights[0],
            metrics,
            train_size: train.len(),
            test_size: test.len(),
            iterations: fit.iterations,
        }),
        diags,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn split_is_stratified_and_disjoint() {
        let labels: Vec<u8> = (0..100).map(|i| u8::from(i % 5 == 0)).collect();
        let mut rng = StdRng::seed_from_u64(42);
        let (train, test) = stratified_split(&labels, 0.25, &mut rng);
        assert_eq!(train.len() + test.len(), 100);
        assert_eq!(test.len(), 25);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 1).count(), 5);
        assert!(train.iter().all(|i| !test.contains(i)));
    }

    #[test]
    fn split_keeps_both_sides_for_tiny_classes() {
        let labels = [1, 1, 0, 0, 0, 0];
        let mut rng = StdRng::seed_from_u64(1);
        let (train, test) = stratified_split(&labels, 0.25, &mut rng);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 1).count(), 1);
        assert_eq!(train.iter().filter(|&&i| labels[i] == 1).count(), 1);
    }

    #[test]
    fn balanced_weights_equalize_classes() {
        let labels = [1, 0, 0, 0];
        let w = balanced_weights(&labels);
        assert_eq!(w[0], 2.0);
        assert!((w[1] - 4.0 / 6.0).abs() < 1e-12);
        let pos: f64 = w[..1].iter().sum();
        let neg: f64 = w[1..].iter().sum();
        assert!((pos - neg).abs() < 1e-12);
    }

    #[test]
    fn metrics_handle_zero_division() {
        let m = classification_metrics(&[0, 0, 1], &[0, 0, 0]);
        assert_eq!(m.accuracy, 0.6667);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
    }

    #[test]
    fn logistic_separates_shifted_classes() {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..200 {
            let label = u8::from(i % 2 == 0);
            let v = if label == 1 { 1.0 } else { -1.0 } + ((i * 37) % 11) as f64 / 10.0 - 0.5;
            x.push(vec![v]);
            y.push(label);
        }
        let fit = fit_logistic(&x, &y, &vec![1.0; 200], 1.0, 100, 1e-10).unwrap();
        assert!(fit.converged);
        assert!(fit.weights[1] > 0.0);
        let correct = x
            .iter()
            .zip(&y)
            .filter(|(xi, yi)| fit.predict(xi) == **yi)
            .count();
        assert!(correct > 180, "correct {correct}");
    }

    #[test]
    fn standardize_population_scale() {
        let mut cols = vec![vec![1.0, 2.0, 3.0], vec![5.0, 5.0, 5.0]];
        standardize(&mut cols);
        assert!((cols[0][0] + (1.5f64).sqrt()).abs() < 1e-12);
        assert_eq!(cols[1], vec![0.0, 0.0, 0.0]);
    }
}
