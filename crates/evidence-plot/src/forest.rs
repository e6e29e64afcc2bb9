//! Forest plot rows

use evidence_core::math::distributions::z_critical;
use evidence_core::{
    AnalysisConfig, ConfidenceInterval, EffectEstimate, EffectMeasure, Error, ErrorContext,
    PoolingModel, Result,
};
use evidence_pooling::PooledResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Whether a row is a study or the pooled summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Study,
    Summary,
}

/// One line of a forest plot, on the reporting scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestRow {
    pub label: String,
    pub kind: RowKind,
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
    /// Share of the pooled weight in percent (100 for the summary row)
    pub weight_percent: f64,
}

/// Data for a forest plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestPlotData {
    pub measure: EffectMeasure,
    pub model: PoolingModel,
    /// Draw the x axis on a log scale
    pub log_axis: bool,
    /// Position of the line of no effect
    pub null_value: f64,
    pub confidence_level: f64,
    /// Study rows in display order, summary row last
    pub rows: Vec<ForestRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_interval: Option<ConfidenceInterval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i_squared: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tau_squared: Option<f64>,
}

/// Build forest rows for the studies behind `pooled`
///
/// `order`, when given, must be a permutation of the study ids; otherwise
/// rows follow the input order.
pub fn forest_plot(
    estimates: &[EffectEstimate],
    pooled: &PooledResult,
    order: Option<&[String]>,
    config: &AnalysisConfig,
) -> Result<ForestPlotData> {
    if estimates.is_empty() {
        return Err(Error::insufficient("forest plot", 1, 0));
    }
    let covered = pooled.study_count() + pooled.excluded_studies.len();
    if estimates.len() != covered {
        return Err(Error::InvalidInput {
            context: ErrorContext::field("estimates"),
            message: format!(
                "pooled result covers {covered} studies but {} estimates were given",
                estimates.len()
            ),
        });
    }

    let mut rows = Vec::with_capacity(estimates.len() + 1);
    let z = z_critical(config.alpha)?;
    let measure = pooled.measure;

    let ordered: Vec<&EffectEstimate> = match order {
        Some(order) => arrange(estimates, order)?,
        None => estimates.iter().collect(),
    };

    for est in ordered {
        if est.measure != measure {
            return Err(Error::invalid_field(
                &est.study_id,
                "measure",
                format!("expected {measure}, got {}", est.measure),
            ));
        }
        let weight = pooled.weights.iter().find(|w| w.study_id == est.study_id);
        let weight_percent = match weight {
            Some(weight) => weight.relative_weight,
            None if pooled.is_excluded(&est.study_id) => 0.0,
            None => {
                return Err(Error::invalid_study(
                    &est.study_id,
                    "study is not part of the pooled result",
                ))
            }
        };
        let margin = z * est.standard_error();
        rows.push(ForestRow {
            label: est.study_id.clone(),
            kind: RowKind::Study,
            estimate: measure.to_reporting_scale(est.estimate),
            lower: measure.to_reporting_scale(est.estimate - margin),
            upper: measure.to_reporting_scale(est.estimate + margin),
            weight_percent,
        });
    }

    rows.push(ForestRow {
        label: match pooled.model {
            PoolingModel::Fixed => "Fixed-effect model".to_string(),
            PoolingModel::Random => "Random-effects model".to_string(),
        },
        kind: RowKind::Summary,
        estimate: pooled.point_estimate,
        lower: pooled.confidence_interval.lower,
        upper: pooled.confidence_interval.upper,
        weight_percent: 100.0,
    });
    debug!(rows = rows.len(), measure = %measure, "forest plot built");

    Ok(ForestPlotData {
        measure,
        model: pooled.model,
        log_axis: measure.is_log_scale(),
        null_value: measure.null_value(),
        confidence_level: config.confidence_level(),
        rows,
        prediction_interval: pooled.prediction_interval,
        i_squared: pooled.heterogeneity.as_ref().map(|h| h.i_squared),
        tau_squared: pooled.heterogeneity.as_ref().map(|h| h.tau_squared),
    })
}

/// Reorder estimates by an explicit list of ids
fn arrange<'a>(
    estimates: &'a [EffectEstimate],
    order: &[String],
) -> Result<Vec<&'a EffectEstimate>> {
    let unique: BTreeSet<&str> = order.iter().map(String::as_str).collect();
    if order.len() != estimates.len() || unique.len() != order.len() {
        return Err(Error::InvalidInput {
            context: ErrorContext::field("order"),
            message: "order must list every study exactly once".to_string(),
        });
    }
    order
        .iter()
        .map(|id| {
            estimates
                .iter()
                .find(|est| &est.study_id == id)
                .ok_or_else(|| Error::InvalidInput {
                    context: ErrorContext::study(id.as_str()).with_field("order"),
                    message: "unknown study in order".to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use evidence_pooling::pool_effects;

    fn set() -> Vec<EffectEstimate> {
        vec![
            EffectEstimate::new("a", 0.2, 0.04, EffectMeasure::MeanDifference),
            EffectEstimate::new("b", 0.5, 0.01, EffectMeasure::MeanDifference),
            EffectEstimate::new("c", -0.1, 0.09, EffectMeasure::MeanDifference),
        ]
    }

    #[test]
    fn test_input_order_then_summary() {
        let config = AnalysisConfig::default();
        let pooled = pool_effects(&set(), PoolingModel::Fixed, &config).unwrap();
        let plot = forest_plot(&set(), &pooled, None, &config).unwrap();

        let labels: Vec<&str> = plot.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b", "c", "Fixed-effect model"]);
        assert_eq!(plot.rows[3].kind, RowKind::Summary);
        let half_width = plot.rows[0].upper - plot.rows[0].estimate;
        assert_abs_diff_eq!(half_width, 1.959964 * 0.2, epsilon = 1e-5);
        let total: f64 = plot.rows[..3].iter().map(|r| r.weight_percent).sum();
        assert_abs_diff_eq!(total, 100.0, epsilon = 1e-9);
        assert!(!plot.log_axis);
        assert_eq!(plot.null_value, 0.0);
    }

    #[test]
    fn test_zero_variance_row_has_no_weight() {
        let config = AnalysisConfig::default();
        let mut studies = set();
        studies.push(EffectEstimate::new("flat", 0.0, 0.0, EffectMeasure::MeanDifference));
        let pooled = pool_effects(&studies, PoolingModel::Fixed, &config).unwrap();
        let plot = forest_plot(&studies, &pooled, None, &config).unwrap();

        assert_eq!(plot.rows.len(), 5);
        let flat = &plot.rows[3];
        assert_eq!(flat.label, "flat");
        assert_eq!(flat.weight_percent, 0.0);
        assert_eq!(flat.lower, flat.upper);
    }

    #[test]
    fn test_explicit_order() {
        let config = AnalysisConfig::default();
        let pooled = pool_effects(&set(), PoolingModel::Random, &config).unwrap();
        let order = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        let plot = forest_plot(&set(), &pooled, Some(&order), &config).unwrap();
        assert_eq!(plot.rows[0].label, "c");
        assert_eq!(plot.rows[3].label, "Random-effects model");
    }

    #[test]
    fn test_order_must_be_permutation() {
        let config = AnalysisConfig::default();
        let pooled = pool_effects(&set(), PoolingModel::Fixed, &config).unwrap();
        let order = vec!["a".to_string(), "a".to_string(), "b".to_string()];
        assert!(forest_plot(&set(), &pooled, Some(&order), &config).is_err());
        let order = vec!["a".to_string(), "b".to_string(), "z".to_string()];
        assert!(forest_plot(&set(), &pooled, Some(&order), &config).is_err());
    }

    #[test]
    fn test_mismatched_pooled_result() {
        let config = AnalysisConfig::default();
        let pooled = pool_effects(&set()[..2], PoolingModel::Fixed, &config).unwrap();
        let err = forest_plot(&set(), &pooled, None, &config).unwrap_err();
        assert_eq!(err.kind(), "InvalidInputError");
    }
}
