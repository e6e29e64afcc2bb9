//! Property-based and worked-example tests for pooling
//!
//! These tests check the invariants the pooling engine promises for any
//! input: order independence, bounded heterogeneity statistics and
//! monotone fixed-effect precision.

use approx::assert_abs_diff_eq;
use evidence_core::{AnalysisConfig, EffectEstimate, EffectMeasure, PoolingModel, StudyRecord};
use evidence_effect::calculate_effect_sizes;
use evidence_pooling::{assess_heterogeneity, pool_effects};
use proptest::prelude::*;

fn to_estimates(pairs: &[(f64, f64)]) -> Vec<EffectEstimate> {
    pairs
        .iter()
        .enumerate()
        .map(|(i, &(y, v))| {
            EffectEstimate::new(format!("S{i}"), y, v, EffectMeasure::MeanDifference)
        })
        .collect()
}

fn relative_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1e-12)
}

#[test]
fn test_worked_example_fixed_effect_log_or() {
    let studies = vec![
        StudyRecord::binary("S1", 10.0, 100.0, 5.0, 100.0),
        StudyRecord::binary("S2", 20.0, 100.0, 10.0, 100.0),
    ];
    let config = AnalysisConfig::default();
    let estimates = calculate_effect_sizes(&studies, EffectMeasure::OddsRatio, &config).unwrap();
    let pooled = pool_effects(&estimates, PoolingModel::Fixed, &config).unwrap();

    // Hand calculation on the 2x2 cells
    let y1 = (10.0_f64 * 95.0 / (90.0 * 5.0)).ln();
    let v1 = 1.0 / 10.0 + 1.0 / 90.0 + 1.0 / 5.0 + 1.0 / 95.0;
    let y2 = (20.0_f64 * 90.0 / (80.0 * 10.0)).ln();
    let v2 = 1.0 / 20.0 + 1.0 / 80.0 + 1.0 / 10.0 + 1.0 / 90.0;
    let (w1, w2) = (1.0 / v1, 1.0 / v2);
    let expected = (w1 * y1 + w2 * y2) / (w1 + w2);

    assert_abs_diff_eq!(pooled.estimate, expected, epsilon = 1e-6);
    assert_abs_diff_eq!(pooled.variance, 1.0 / (w1 + w2), epsilon = 1e-9);
    assert_abs_diff_eq!(pooled.point_estimate, expected.exp(), epsilon = 1e-6);
    assert!(pooled.log_scale);
}

#[test]
fn test_adding_studies_never_widens_fixed_interval() {
    let all = to_estimates(&[(0.2, 0.3), (0.5, 0.1), (-0.1, 0.8), (0.3, 0.05), (1.2, 2.0)]);
    let config = AnalysisConfig::default();
    let mut previous = f64::INFINITY;
    for k in 1..=all.len() {
        let pooled = pool_effects(&all[..k], PoolingModel::Fixed, &config).unwrap();
        assert!(pooled.variance <= previous);
        previous = pooled.variance;
    }
}

proptest! {
    // Property: permuting the studies never changes the pooled estimate
    #[test]
    fn prop_pooling_is_order_independent(
        (pairs, order) in prop::collection::vec((-3.0f64..3.0, 0.01f64..2.0), 2..15)
            .prop_flat_map(|v| {
                let n = v.len();
                (Just(v), Just((0..n).collect::<Vec<usize>>()).prop_shuffle())
            })
    ) {
        let labelled = to_estimates(&pairs);
        let permuted: Vec<EffectEstimate> = order.iter().map(|&i| labelled[i].clone()).collect();

        let config = AnalysisConfig::default();
        for model in [PoolingModel::Fixed, PoolingModel::Random] {
            let a = pool_effects(&labelled, model, &config).unwrap();
            let b = pool_effects(&permuted, model, &config).unwrap();
            prop_assert!(relative_close(a.estimate, b.estimate));
            prop_assert!(relative_close(a.variance, b.variance));
            prop_assert!(relative_close(a.confidence_interval.lower, b.confidence_interval.lower));
            prop_assert!(relative_close(a.confidence_interval.upper, b.confidence_interval.upper));
        }
    }

    // Property: I² stays in [0, 100] and τ² is never negative
    #[test]
    fn prop_heterogeneity_bounds(
        pairs in prop::collection::vec((-10.0f64..10.0, 0.001f64..5.0), 2..25)
    ) {
        let stats = assess_heterogeneity(&to_estimates(&pairs)).unwrap();
        prop_assert!((0.0..=100.0).contains(&stats.i_squared));
        prop_assert!(stats.tau_squared >= 0.0);
        prop_assert_eq!(stats.degrees_of_freedom, pairs.len() - 1);
        prop_assert!((0.0..=1.0).contains(&stats.p_value));
    }

    // Property: adding a study never increases the fixed-effect variance
    #[test]
    fn prop_fixed_variance_monotone(
        pairs in prop::collection::vec((-3.0f64..3.0, 0.01f64..2.0), 2..12)
    ) {
        let estimates = to_estimates(&pairs);
        let config = AnalysisConfig::default();
        let mut previous = f64::INFINITY;
        for k in 1..=estimates.len() {
            let pooled = pool_effects(&estimates[..k], PoolingModel::Fixed, &config).unwrap();
            prop_assert!(pooled.variance <= previous * (1.0 + 1e-12));
            previous = pooled.variance;
        }
    }

    // Property: relative weights always sum to 100
    #[test]
    fn prop_relative_weights_sum_to_100(
        pairs in prop::collection::vec((-3.0f64..3.0, 0.01f64..2.0), 2..12)
    ) {
        let config = AnalysisConfig::default();
        let pooled = pool_effects(&to_estimates(&pairs), PoolingModel::Random, &config).unwrap();
        let total: f64 = pooled.weights.iter().map(|w| w.relative_weight).sum();
        prop_assert!((total - 100.0).abs() < 1e-9);
    }
}
