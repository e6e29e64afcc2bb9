//! Inverse-variance pooling under fixed- and random-effects models

use crate::heterogeneity::{self, HeterogeneityStats};
use crate::validate::split_zero_variance;
use evidence_core::math::distributions::{
    t_critical, two_sided_normal_p, two_sided_t_p, z_critical,
};
use evidence_core::{
    ensure_finite, AnalysisConfig, ConfidenceInterval, EffectEstimate, EffectMeasure,
    PoolingModel, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Weight given to one study in a pooled estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyWeight {
    /// Study identifier
    pub study_id: String,
    /// Absolute inverse-variance weight (DL-adjusted under random effects)
    pub weight: f64,
    /// Share of the total weight in percent
    pub relative_weight: f64,
}

/// Summary estimate combining several studies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PooledResult {
    /// Effect measure
    pub measure: EffectMeasure,
    /// Pooling model
    pub model: PoolingModel,
    /// Whether `estimate` is a log ratio
    pub log_scale: bool,
    /// Pooled estimate on the analysis scale
    pub estimate: f64,
    /// Variance of `estimate`
    pub variance: f64,
    /// Standard error of `estimate`
    pub standard_error: f64,
    /// Pooled estimate on the reporting scale
    pub point_estimate: f64,
    /// Confidence interval on the reporting scale
    pub confidence_interval: ConfidenceInterval,
    /// Test statistic (t under Hartung-Knapp)
    pub z_value: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Between-study variance used for the weights (0 for fixed effect)
    pub tau_squared: f64,
    /// Per-study weights in input order
    pub weights: Vec<StudyWeight>,
    /// Zero-variance studies left out of the weights
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_studies: Vec<String>,
    /// Single-study pooling: the study's own estimate, unweighted
    pub degenerate: bool,
    /// Whether the Hartung-Knapp adjustment was applied
    pub hartung_knapp: bool,
    /// Random-effects prediction interval on the reporting scale (k >= 3)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_interval: Option<ConfidenceInterval>,
    /// Heterogeneity of the pooled set (k >= 2)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heterogeneity: Option<HeterogeneityStats>,
}

impl PooledResult {
    /// Number of studies carrying a weight
    pub fn study_count(&self) -> usize {
        self.weights.len()
    }

    /// Whether a study was set aside for having zero variance
    pub fn is_excluded(&self, study_id: &str) -> bool {
        self.excluded_studies.iter().any(|id| id == study_id)
    }

    /// Absolute weight of a study, if it contributed
    pub fn weight_of(&self, study_id: &str) -> Option<f64> {
        self.weights
            .iter()
            .find(|w| w.study_id == study_id)
            .map(|w| w.weight)
    }

    /// Whether the pooled effect differs from no effect at `alpha`
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

impl fmt::Display for PooledResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, k = {}): {:.3} [{:.3}, {:.3}], p = {:.4}",
            self.measure,
            self.model,
            self.study_count(),
            self.point_estimate,
            self.confidence_interval.lower,
            self.confidence_interval.upper,
            self.p_value
        )
    }
}

/// Inverse-variance weighted mean of validated estimates with an added τ²
pub(crate) struct WeightedMean {
    pub mean: f64,
    pub variance: f64,
    pub weights: Vec<f64>,
    pub sum_w: f64,
}

pub(crate) fn weighted_mean(estimates: &[EffectEstimate], tau_squared: f64) -> WeightedMean {
    let weights: Vec<f64> = estimates
        .iter()
        .map(|est| 1.0 / (est.variance + tau_squared))
        .collect();
    let sum_w: f64 = weights.iter().sum();
    let sum_wy: f64 = estimates
        .iter()
        .zip(&weights)
        .map(|(est, w)| w * est.estimate)
        .sum();

    WeightedMean {
        mean: sum_wy / sum_w,
        variance: 1.0 / sum_w,
        weights,
        sum_w,
    }
}

/// Combine effect estimates into one summary estimate
///
/// A single estimate is returned as-is with `degenerate = true`. Studies
/// with zero variance are left out of the weights and listed in
/// `excluded_studies`; the call fails only when no other study remains.
/// Under the
/// random-effects model weights are `1/(vᵢ + τ²)` with τ² from
/// DerSimonian-Laird. Intervals are formed on the analysis scale and
/// exponentiated for ratio measures.
pub fn pool_effects(
    estimates: &[EffectEstimate],
    model: PoolingModel,
    config: &AnalysisConfig,
) -> Result<PooledResult> {
    config.validate()?;
    let split = split_zero_variance(estimates, "pooling", 1)?;
    let measure = split.measure;
    let excluded_studies = split.zero_variance;
    let estimates = split.usable.as_slice();
    let log_scale = measure.is_log_scale();
    let level = config.confidence_level();
    let k = estimates.len();

    if k == 1 {
        let only = &estimates[0];
        warn!(study = %only.study_id, "pooling a single study; returning it unweighted");
        let se = only.standard_error();
        let z = only.estimate / se;
        let margin = z_critical(config.alpha)? * se;
        let ci = ConfidenceInterval::symmetric(only.estimate, margin, level);
        return Ok(PooledResult {
            measure,
            model,
            log_scale,
            estimate: only.estimate,
            variance: only.variance,
            standard_error: se,
            point_estimate: measure.to_reporting_scale(only.estimate),
            confidence_interval: ci.map(|x| measure.to_reporting_scale(x)),
            z_value: z,
            p_value: two_sided_normal_p(z)?,
            tau_squared: 0.0,
            weights: vec![StudyWeight {
                study_id: only.study_id.clone(),
                weight: 1.0,
                relative_weight: 100.0,
            }],
            excluded_studies,
            degenerate: true,
            hartung_knapp: false,
            prediction_interval: None,
            heterogeneity: None,
        });
    }

    let mut stats = heterogeneity::compute(estimates)?;
    stats.excluded_studies = excluded_studies.clone();
    let tau_squared = match model {
        PoolingModel::Fixed => 0.0,
        PoolingModel::Random => stats.tau_squared,
    };
    let pooled = weighted_mean(estimates, tau_squared);
    let hartung_knapp = model == PoolingModel::Random && config.hartung_knapp;

    let (variance, critical, z_value, p_value) = if hartung_knapp {
        // Truncated variant: the scaling factor never shrinks the DL variance
        let df = (k - 1) as f64;
        let scale: f64 = estimates
            .iter()
            .zip(&pooled.weights)
            .map(|(est, w)| w * (est.estimate - pooled.mean).powi(2))
            .sum::<f64>()
            / df;
        let variance = scale.max(1.0) * pooled.variance;
        let t = pooled.mean / variance.sqrt();
        (variance, t_critical(config.alpha, df)?, t, two_sided_t_p(t, df)?)
    } else {
        let z = pooled.mean / pooled.variance.sqrt();
        (pooled.variance, z_critical(config.alpha)?, z, two_sided_normal_p(z)?)
    };

    let standard_error = variance.sqrt();
    let estimate = ensure_finite(pooled.mean, "pooled estimate")?;
    ensure_finite(standard_error, "pooled standard error")?;
    let z_value = ensure_finite(z_value, "pooled test statistic")?;

    let ci = ConfidenceInterval::symmetric(estimate, critical * standard_error, level);

    let wants_prediction = model == PoolingModel::Random && config.prediction_interval;
    let prediction_interval = if wants_prediction && k >= 3 {
        let t = t_critical(config.alpha, (k - 2) as f64)?;
        let margin = t * (tau_squared + variance).sqrt();
        Some(
            ConfidenceInterval::symmetric(estimate, margin, level)
                .map(|x| measure.to_reporting_scale(x)),
        )
    } else {
        None
    };

    let weights = estimates
        .iter()
        .zip(&pooled.weights)
        .map(|(est, &w)| StudyWeight {
            study_id: est.study_id.clone(),
            weight: w,
            relative_weight: 100.0 * w / pooled.sum_w,
        })
        .collect();

    debug!(
        %measure, %model, k, estimate, standard_error, tau_squared,
        "pooled effect estimates"
    );

    Ok(PooledResult {
        measure,
        model,
        log_scale,
        estimate,
        variance,
        standard_error,
        point_estimate: measure.to_reporting_scale(estimate),
        confidence_interval: ci.map(|x| measure.to_reporting_scale(x)),
        z_value,
        p_value,
        tau_squared,
        weights,
        excluded_studies,
        degenerate: false,
        hartung_knapp,
        prediction_interval,
        heterogeneity: Some(stats),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn est(id: &str, y: f64, v: f64) -> EffectEstimate {
        EffectEstimate::new(id, y, v, EffectMeasure::MeanDifference)
    }

    #[test]
    fn test_fixed_effect_closed_form() {
        let set = vec![est("a", 1.0, 0.5), est("b", 2.0, 0.25)];
        let pooled = pool_effects(&set, PoolingModel::Fixed, &AnalysisConfig::default()).unwrap();

        // w = 2, 4
        assert_abs_diff_eq!(pooled.estimate, (2.0 + 8.0) / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pooled.variance, 1.0 / 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pooled.weight_of("b").unwrap(), 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pooled.weights[0].relative_weight, 100.0 / 3.0, epsilon = 1e-9);
        assert!(!pooled.degenerate);
        assert_eq!(pooled.tau_squared, 0.0);

        let margin = 1.959964 * (1.0_f64 / 6.0).sqrt();
        let centre = 10.0 / 6.0;
        let ci = pooled.confidence_interval;
        assert_abs_diff_eq!(ci.lower, centre - margin, epsilon = 1e-5);
        assert_abs_diff_eq!(ci.upper, centre + margin, epsilon = 1e-5);
        let z = centre / (1.0_f64 / 6.0).sqrt();
        assert_abs_diff_eq!(pooled.z_value, z, epsilon = 1e-12);
    }

    #[test]
    fn test_random_effects_uses_tau_squared() {
        let set = vec![
            est("a", -1.0, 0.01),
            est("b", 0.0, 0.02),
            est("c", 1.0, 0.01),
            est("d", 2.0, 0.03),
        ];
        let config = AnalysisConfig::default();
        let fixed = pool_effects(&set, PoolingModel::Fixed, &config).unwrap();
        let random = pool_effects(&set, PoolingModel::Random, &config).unwrap();

        let tau2 = random.heterogeneity.as_ref().unwrap().tau_squared;
        assert!(tau2 > 0.0);
        assert_eq!(random.tau_squared, tau2);
        let weight_a = random.weight_of("a").unwrap();
        assert_abs_diff_eq!(weight_a, 1.0 / (0.01 + tau2), epsilon = 1e-12);
        assert!(random.standard_error > fixed.standard_error);
        assert!(random.prediction_interval.is_some());
        assert!(fixed.prediction_interval.is_none());

        let pi = random.prediction_interval.unwrap();
        assert!(pi.width() > random.confidence_interval.width());
    }

    #[test]
    fn test_random_equals_fixed_without_heterogeneity() {
        let set = vec![est("a", 0.3, 0.1), est("b", 0.3, 0.2), est("c", 0.3, 0.3)];
        let config = AnalysisConfig::default();
        let fixed = pool_effects(&set, PoolingModel::Fixed, &config).unwrap();
        let random = pool_effects(&set, PoolingModel::Random, &config).unwrap();
        assert_abs_diff_eq!(fixed.estimate, random.estimate, epsilon = 1e-12);
        assert_abs_diff_eq!(fixed.variance, random.variance, epsilon = 1e-12);
    }

    #[test]
    fn test_log_scale_interval_is_exponentiated() {
        let set = vec![
            EffectEstimate::new("a", 0.5, 0.04, EffectMeasure::OddsRatio),
            EffectEstimate::new("b", 0.7, 0.09, EffectMeasure::OddsRatio),
        ];
        let pooled = pool_effects(&set, PoolingModel::Fixed, &AnalysisConfig::default()).unwrap();
        assert!(pooled.log_scale);
        assert_abs_diff_eq!(pooled.point_estimate, pooled.estimate.exp(), epsilon = 1e-12);
        let margin = 1.959964 * pooled.standard_error;
        assert_abs_diff_eq!(
            pooled.confidence_interval.lower,
            (pooled.estimate - margin).exp(),
            epsilon = 1e-5
        );
        assert!(pooled.confidence_interval.contains(pooled.point_estimate));
    }

    #[test]
    fn test_single_study_is_degenerate() {
        let set = [est("only", 0.4, 0.04)];
        let pooled = pool_effects(&set, PoolingModel::Random, &AnalysisConfig::default()).unwrap();
        assert!(pooled.degenerate);
        assert_eq!(pooled.estimate, 0.4);
        assert_eq!(pooled.variance, 0.04);
        assert_eq!(pooled.weights[0].weight, 1.0);
        assert!(pooled.heterogeneity.is_none());
    }

    #[test]
    fn test_hartung_knapp_widens_interval() {
        let set = vec![
            est("a", 0.1, 0.02),
            est("b", 0.6, 0.03),
            est("c", 0.2, 0.02),
            est("d", 0.9, 0.05),
        ];
        let plain = pool_effects(&set, PoolingModel::Random, &AnalysisConfig::default()).unwrap();
        let hk = pool_effects(
            &set,
            PoolingModel::Random,
            &AnalysisConfig::default().hartung_knapp(true),
        )
        .unwrap();
        assert!(hk.hartung_knapp);
        assert!(!plain.hartung_knapp);
        assert_abs_diff_eq!(hk.estimate, plain.estimate, epsilon = 1e-12);
        assert!(hk.confidence_interval.width() > plain.confidence_interval.width());
    }

    #[test]
    fn test_zero_variance_study_is_excluded() {
        let set = vec![est("a", 1.0, 0.5), est("flat", 0.0, 0.0), est("b", 2.0, 0.25)];
        let config = AnalysisConfig::default();
        let pooled = pool_effects(&set, PoolingModel::Random, &config).unwrap();
        let kept = [est("a", 1.0, 0.5), est("b", 2.0, 0.25)];
        let reference = pool_effects(&kept, PoolingModel::Random, &config).unwrap();

        assert_eq!(pooled.excluded_studies, vec!["flat".to_string()]);
        assert!(pooled.is_excluded("flat"));
        assert_eq!(pooled.study_count(), 2);
        assert!(pooled.weight_of("flat").is_none());
        assert_abs_diff_eq!(pooled.estimate, reference.estimate, epsilon = 1e-12);
        assert_abs_diff_eq!(pooled.variance, reference.variance, epsilon = 1e-12);
        assert!(!pooled.degenerate);
    }

    #[test]
    fn test_only_zero_variance_studies_fail() {
        let set = vec![est("x", 0.0, 0.0), est("y", 0.0, 0.0)];
        let err = pool_effects(&set, PoolingModel::Fixed, &AnalysisConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "DegenerateResultError");
    }

    #[test]
    fn test_empty_input() {
        let err = pool_effects(&[], PoolingModel::Fixed, &AnalysisConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "InsufficientDataError");
    }

    #[test]
    fn test_invalid_alpha() {
        let set = vec![est("a", 0.3, 0.1), est("b", 0.3, 0.2)];
        let config = AnalysisConfig::default().alpha(2.0);
        assert!(pool_effects(&set, PoolingModel::Fixed, &config).is_err());
    }
}
