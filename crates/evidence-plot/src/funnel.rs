//! Funnel plot points and pseudo-confidence limits

use evidence_bias::{FunnelPoint, PublicationBiasResult, TrimAndFill};
use evidence_core::math::distributions::z_critical;
use evidence_core::{AnalysisConfig, Error, ErrorContext, Result};
use evidence_pooling::PooledResult;
use serde::{Deserialize, Serialize};

/// Pseudo-confidence limits at one standard error
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FunnelLimit {
    pub standard_error: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Data for a funnel plot, on the analysis scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelPlotData {
    /// Observed studies in input order
    pub points: Vec<FunnelPoint>,
    /// Studies imputed by trim-and-fill
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imputed: Vec<FunnelPoint>,
    /// Vertical reference line
    pub center: f64,
    /// Limit lines from the apex (SE = 0) to the largest standard error
    pub limits: [FunnelLimit; 2],
    pub log_scale: bool,
    pub is_asymmetric: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egger_p_value: Option<f64>,
}

/// Funnel plot of a bias assessment centred on a pooled estimate
pub fn funnel_plot(
    bias: &PublicationBiasResult,
    pooled: &PooledResult,
    config: &AnalysisConfig,
) -> Result<FunnelPlotData> {
    if bias.funnel_points.len() != pooled.study_count() {
        return Err(Error::InvalidInput {
            context: ErrorContext::field("bias"),
            message: format!(
                "bias assessment has {} points but the pooled result covers {} studies",
                bias.funnel_points.len(),
                pooled.study_count()
            ),
        });
    }
    build(bias, Vec::new(), pooled, config)
}

/// Funnel plot with trim-and-fill studies, centred on the adjusted estimate
pub fn funnel_plot_with_fill(
    bias: &PublicationBiasResult,
    fill: &TrimAndFill,
    config: &AnalysisConfig,
) -> Result<FunnelPlotData> {
    let imputed = fill
        .imputed
        .iter()
        .map(|est| FunnelPoint {
            study_id: est.study_id.clone(),
            estimate: est.estimate,
            precision: est.precision(),
        })
        .collect();
    build(bias, imputed, &fill.adjusted, config)
}

fn build(
    bias: &PublicationBiasResult,
    imputed: Vec<FunnelPoint>,
    pooled: &PooledResult,
    config: &AnalysisConfig,
) -> Result<FunnelPlotData> {
    let z = z_critical(config.alpha)?;
    let center = pooled.estimate;
    let max_se = bias
        .funnel_points
        .iter()
        .chain(&imputed)
        .map(|p| 1.0 / p.precision)
        .fold(0.0, f64::max);

    Ok(FunnelPlotData {
        points: bias.funnel_points.clone(),
        imputed,
        center,
        limits: [
            FunnelLimit {
                standard_error: 0.0,
                lower: center,
                upper: center,
            },
            FunnelLimit {
                standard_error: max_se,
                lower: center - z * max_se,
                upper: center + z * max_se,
            },
        ],
        log_scale: pooled.log_scale,
        is_asymmetric: bias.is_asymmetric,
        egger_p_value: bias.egger_p_value(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use evidence_bias::{detect_publication_bias, trim_and_fill};
    use evidence_core::{EffectEstimate, EffectMeasure, PoolingModel};
    use evidence_pooling::pool_effects;

    fn set() -> Vec<EffectEstimate> {
        (1..=6)
            .map(|i| {
                let se = 0.1 * i as f64;
                let y = 0.1 + se;
                EffectEstimate::new(format!("S{i}"), y, se * se, EffectMeasure::MeanDifference)
            })
            .collect()
    }

    #[test]
    fn test_limits_span_largest_standard_error() {
        let config = AnalysisConfig::default();
        let bias = detect_publication_bias(&set(), &config).unwrap();
        let pooled = pool_effects(&set(), PoolingModel::Fixed, &config).unwrap();
        let plot = funnel_plot(&bias, &pooled, &config).unwrap();

        assert_eq!(plot.points.len(), 6);
        assert_eq!(plot.points[0].study_id, "S1");
        assert_abs_diff_eq!(plot.limits[1].standard_error, 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(plot.limits[1].upper - plot.center, 1.959964 * 0.6, epsilon = 1e-5);
        assert_eq!(plot.limits[0].lower, plot.center);
    }

    #[test]
    fn test_fill_adds_imputed_points() {
        let config = AnalysisConfig::default();
        let bias = detect_publication_bias(&set(), &config).unwrap();
        let fill = trim_and_fill(&set(), PoolingModel::Fixed, &config).unwrap();
        let plot = funnel_plot_with_fill(&bias, &fill, &config).unwrap();
        assert_eq!(plot.imputed.len(), fill.missing_studies);
        assert_eq!(plot.center, fill.adjusted.estimate);
    }

    #[test]
    fn test_mismatched_inputs() {
        let config = AnalysisConfig::default();
        let bias = detect_publication_bias(&set(), &config).unwrap();
        let pooled = pool_effects(&set()[..3], PoolingModel::Fixed, &config).unwrap();
        assert!(funnel_plot(&bias, &pooled, &config).is_err());
    }
}
