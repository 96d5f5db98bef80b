//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Interval nesting: lower_95 ≤ lower_80 ≤ forecast ≤ upper_80 ≤ upper_95
//! 2. Differencing choice is a pure function of the ADF p-value
//! 3. Risk metric ordering: CVaR ≤ VaR ≤ median ≤ P95
//! 4. Rank correlation bounds
//! 5. Pay gap sign and symmetry

use chrono::NaiveDate;
use proptest::prelude::*;
use meridian_core::forecast::{differencing_order, forecast_ticker, ForecastConfig, TickerOutcome};
use meridian_core::hr::pay_gap::gap_percent;
use meridian_core::risk::RiskMetrics;
use meridian_core::stats::spearman;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Positive price path from bounded monthly returns.
fn arb_prices() -> impl Strategy<Value = Vec<f64>> {
    (12usize..40, prop::collection::vec(-0.08..0.08_f64, 40), 20.0..500.0_f64).prop_map(
        |(n, returns, start)| {
            let mut price = start;
            returns[..n]
                .iter()
                .map(|r| {
                    price *= 1.0 + r;
                    price
                })
                .collect()
        },
    )
}

fn arb_terminal_values() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.2..2.5_f64, 1..400)
}

// ── 1. Interval nesting ──────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn forecast_intervals_nest(prices in arb_prices()) {
        let last = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let (outcome, _) = forecast_ticker("P", &prices, last, &ForecastConfig::default());
        if let TickerOutcome::Forecast { records, .. } = outcome {
            prop_assert_eq!(records.len(), 12);
            for r in &records {
                prop_assert!(r.lower_95 <= r.lower_80, "{:?}", r);
                prop_assert!(r.lower_80 <= r.forecast, "{:?}", r);
                prop_assert!(r.forecast <= r.upper_80, "{:?}", r);
                prop_assert!(r.upper_80 <= r.upper_95, "{:?}", r);
            }
        }
    }
}

// ── 2. Differencing order ────────────────────────────────────────────

proptest! {
    #[test]
    fn differencing_follows_p_value(p in 0.0..1.0_f64) {
        let d = differencing_order(p);
        if p >= 0.05 {
            prop_assert_eq!(d, 1);
        } else {
            prop_assert_eq!(d, 0);
        }
    }
}

// ── 3. Risk metric ordering ──────────────────────────────────────────

proptest! {
    #[test]
    fn risk_metrics_ordered(finals in arb_terminal_values()) {
        let m = RiskMetrics::from_terminal_values(&finals).unwrap();
        prop_assert!(m.cvar_95 <= m.var_95);
        prop_assert!(m.var_95 <= m.base_case);
        prop_assert!(m.base_case <= m.best_case);
        prop_assert!((0.0..=100.0).contains(&m.pct_positive));
        prop_assert_eq!(m.worst_case, m.var_95);
    }
}

// ── 4. Rank correlation bounds ───────────────────────────────────────

proptest! {
    #[test]
    fn spearman_is_bounded(
        pairs in prop::collection::vec((-100.0..100.0_f64, -100.0..100.0_f64), 3..60)
    ) {
        let (x, y): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        if let Some(test) = spearman(&x, &y) {
            prop_assert!((-1.0..=1.0).contains(&test.coefficient));
            prop_assert!((0.0..=1.0).contains(&test.p_value));
        }
    }

    #[test]
    fn spearman_invariant_under_monotone_transform(
        x in prop::collection::vec(0.1..100.0_f64, 5..40),
        y in prop::collection::vec(-10.0..10.0_f64, 40),
    ) {
        let y = &y[..x.len()];
        let logged: Vec<f64> = x.iter().map(|v| v.ln()).collect();
        let a = spearman(&x, y).map(|t| t.coefficient);
        let b = spearman(&logged, y).map(|t| t.coefficient);
        match (a, b) {
            (Some(a), Some(b)) => prop_assert!((a - b).abs() < 1e-9),
            (a, b) => prop_assert_eq!(a.is_none(), b.is_none()),
        }
    }
}

// ── 5. Pay gap ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn gap_sign_follows_higher_group(a in 1.0..20_000.0_f64, b in 1.0..20_000.0_f64) {
        let gap = gap_percent(a, b);
        prop_assert!(gap.abs() <= 100.0);
        prop_assert_eq!(gap > 0.0, a > b);
        prop_assert!((gap + gap_percent(b, a)).abs() < 1e-9);
    }
}
