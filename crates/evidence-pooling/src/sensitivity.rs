//! Leave-one-out sensitivity analysis

use crate::pooling::{pool_effects, PooledResult};
use crate::validate::check_estimates;
use evidence_core::{AnalysisConfig, EffectEstimate, PoolingModel, Result};
use serde::{Deserialize, Serialize};

/// Pooled result with one study omitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveOneOut {
    /// The study left out
    pub omitted_study: String,
    /// Pooled result of the remaining studies
    pub pooled: PooledResult,
}

/// Re-pool the set once per study, omitting that study each time
///
/// Needs at least three estimates so every reduced set still has two.
pub fn leave_one_out(
    estimates: &[EffectEstimate],
    model: PoolingModel,
    config: &AnalysisConfig,
) -> Result<Vec<LeaveOneOut>> {
    check_estimates(estimates, "leave-one-out analysis", 3)?;

    (0..estimates.len())
        .map(|skip| {
            let subset: Vec<EffectEstimate> = estimates
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, est)| est.clone())
                .collect();
            Ok(LeaveOneOut {
                omitted_study: estimates[skip].study_id.clone(),
                pooled: pool_effects(&subset, model, config)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use evidence_core::EffectMeasure;

    #[test]
    fn test_outlier_moves_estimate() {
        let set = vec![
            EffectEstimate::new("a", 0.2, 0.05, EffectMeasure::MeanDifference),
            EffectEstimate::new("b", 0.25, 0.05, EffectMeasure::MeanDifference),
            EffectEstimate::new("outlier", 3.0, 0.05, EffectMeasure::MeanDifference),
        ];
        let results = leave_one_out(&set, PoolingModel::Fixed, &AnalysisConfig::default()).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[2].omitted_study, "outlier");
        assert_abs_diff_eq!(results[2].pooled.estimate, 0.225, epsilon = 1e-12);
        assert!(results[0].pooled.estimate > 1.0);
        assert_eq!(results[2].pooled.study_count(), 2);
    }

    #[test]
    fn test_needs_three_studies() {
        let set = vec![
            EffectEstimate::new("a", 0.2, 0.05, EffectMeasure::MeanDifference),
            EffectEstimate::new("b", 0.25, 0.05, EffectMeasure::MeanDifference),
        ];
        assert!(leave_one_out(&set, PoolingModel::Fixed, &AnalysisConfig::default()).is_err());
    }
}
