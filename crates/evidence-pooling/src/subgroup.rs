//! Subgroup analysis with a between-subgroup heterogeneity test

use crate::pooling::{pool_effects, PooledResult};
use crate::validate::check_estimates;
use evidence_core::math::distributions::chi_squared_upper_tail;
use evidence_core::{
    AnalysisConfig, Covariate, EffectEstimate, Error, ErrorContext, PoolingModel, Result,
    StudyRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pooled result of one subgroup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgroupResult {
    /// Subgroup label
    pub label: String,
    /// Pooled result of the subgroup's studies
    pub pooled: PooledResult,
}

/// Per-subgroup pooled results and the test for subgroup differences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgroupAnalysis {
    /// Subgroups in order of first appearance
    pub subgroups: Vec<SubgroupResult>,
    /// Q statistic between subgroup estimates
    pub q_between: f64,
    /// Number of subgroups minus one
    pub degrees_of_freedom: usize,
    /// Chi-square p-value of `q_between`
    pub p_value: f64,
}

/// Read subgroup labels from a categorical (or flag) covariate
pub fn subgroups_from_covariate(
    studies: &[StudyRecord],
    covariate: &str,
) -> Result<BTreeMap<String, String>> {
    studies
        .iter()
        .map(|study| match study.covariates.get(covariate) {
            Some(value @ (Covariate::Categorical(_) | Covariate::Flag(_))) => {
                Ok((study.study_id.clone(), value.to_string()))
            }
            Some(Covariate::Numeric(_)) => Err(Error::invalid_field(
                &study.study_id,
                covariate,
                "subgroups need a categorical covariate",
            )),
            None => Err(Error::invalid_field(
                &study.study_id,
                covariate,
                "covariate missing",
            )),
        })
        .collect()
}

/// Pool each subgroup separately and test whether subgroup estimates differ
///
/// `assignments` maps every study id to a subgroup label. At least two
/// subgroups are required.
pub fn subgroup_analysis(
    estimates: &[EffectEstimate],
    assignments: &BTreeMap<String, String>,
    model: PoolingModel,
    config: &AnalysisConfig,
) -> Result<SubgroupAnalysis> {
    check_estimates(estimates, "subgroup analysis", 2)?;

    let mut groups: Vec<(String, Vec<EffectEstimate>)> = Vec::new();
    for est in estimates {
        let label = assignments.get(&est.study_id).ok_or_else(|| Error::InvalidInput {
            context: ErrorContext::study(&est.study_id).with_field("subgroup"),
            message: "study has no subgroup assignment".to_string(),
        })?;
        match groups.iter_mut().find(|(l, _)| l == label) {
            Some((_, members)) => members.push(est.clone()),
            None => groups.push((label.clone(), vec![est.clone()])),
        }
    }
    if groups.len() < 2 {
        return Err(Error::insufficient("subgroup comparison", 2, groups.len()));
    }

    let subgroups = groups
        .into_iter()
        .map(|(label, members)| {
            Ok(SubgroupResult {
                label,
                pooled: pool_effects(&members, model, config)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let weights: Vec<f64> = subgroups.iter().map(|s| 1.0 / s.pooled.variance).collect();
    let sum_w: f64 = weights.iter().sum();
    let overall = subgroups
        .iter()
        .zip(&weights)
        .map(|(s, w)| w * s.pooled.estimate)
        .sum::<f64>()
        / sum_w;
    let q_between = subgroups
        .iter()
        .zip(&weights)
        .map(|(s, w)| w * (s.pooled.estimate - overall).powi(2))
        .sum::<f64>();
    let df = subgroups.len() - 1;

    Ok(SubgroupAnalysis {
        q_between,
        degrees_of_freedom: df,
        p_value: chi_squared_upper_tail(q_between, df as f64)?,
        subgroups,
    })
}
