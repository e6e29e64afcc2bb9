//! Duval and Tweedie's trim-and-fill with the L0 estimator

use crate::egger::egger_test;
use evidence_core::{AnalysisConfig, EffectEstimate, PoolingModel, Result};
use evidence_pooling::{check_estimates, pool_effects, PooledResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const MAX_ITERATIONS: usize = 100;

/// Side of the funnel where studies are presumed missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunnelSide {
    Left,
    Right,
}

impl fmt::Display for FunnelSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunnelSide::Left => write!(f, "left"),
            FunnelSide::Right => write!(f, "right"),
        }
    }
}

/// Estimated missing studies and the pooled result after filling them in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimAndFill {
    /// Side the imputed studies were added to
    pub side: FunnelSide,
    /// Estimated number of missing studies (L0, rounded)
    pub missing_studies: usize,
    /// Mirror images of the most extreme studies, with the same variances
    pub imputed: Vec<EffectEstimate>,
    /// Pooled result of the observed studies
    pub original: PooledResult,
    /// Pooled result of observed plus imputed studies
    pub adjusted: PooledResult,
    /// Trim iterations until the estimate of missing studies settled
    pub iterations: usize,
}

/// Estimate and impute studies missing from an asymmetric funnel
///
/// The side is taken from the sign of Egger's intercept: a positive
/// intercept (small studies with larger effects) means studies are missing
/// on the left. When Egger's regression is undefined the left side is
/// assumed. Needs at least three estimates.
pub fn trim_and_fill(
    estimates: &[EffectEstimate],
    model: PoolingModel,
    config: &AnalysisConfig,
) -> Result<TrimAndFill> {
    check_estimates(estimates, "trim-and-fill", 3)?;

    let side = match egger_test(estimates) {
        Ok(egger) if egger.intercept < 0.0 => FunnelSide::Right,
        _ => FunnelSide::Left,
    };
    let sign = match side {
        FunnelSide::Left => 1.0,
        FunnelSide::Right => -1.0,
    };

    // Orient so the excess studies lie above the centre, then sort ascending
    let mut oriented: Vec<EffectEstimate> = estimates
        .iter()
        .map(|est| EffectEstimate {
            estimate: sign * est.estimate,
            ..est.clone()
        })
        .collect();
    oriented.sort_by(|a, b| a.estimate.total_cmp(&b.estimate));

    let k = oriented.len();
    let mut missing = 0;
    let mut iterations = 0;
    let centre = loop {
        iterations += 1;
        let centre = pool_effects(&oriented[..k - missing], model, config)?.estimate;
        let next = l0_estimate(&oriented, centre).min(k - 2);
        if next == missing || iterations == MAX_ITERATIONS {
            break centre;
        }
        missing = next;
    };

    let imputed: Vec<EffectEstimate> = oriented[k - missing..]
        .iter()
        .map(|est| EffectEstimate {
            study_id: format!("{} (filled)", est.study_id),
            estimate: sign * (2.0 * centre - est.estimate),
            ..est.clone()
        })
        .collect();

    debug!(
        side = %side,
        missing,
        iterations,
        "trim-and-fill converged"
    );

    let original = pool_effects(estimates, model, config)?;
    let adjusted = if imputed.is_empty() {
        original.clone()
    } else {
        let mut filled = estimates.to_vec();
        filled.extend(imputed.iter().cloned());
        pool_effects(&filled, model, config)?
    };

    Ok(TrimAndFill {
        side,
        missing_studies: missing,
        imputed,
        original,
        adjusted,
        iterations,
    })
}

/// `L0 = (4·Tₙ − n(n+1)) / (2n − 1)`, where `Tₙ` is the Wilcoxon rank sum of
/// the studies above the centre
fn l0_estimate(oriented: &[EffectEstimate], centre: f64) -> usize {
    let deviations: Vec<f64> = oriented.iter().map(|est| est.estimate - centre).collect();
    let ranks = average_ranks(&deviations.iter().map(|d| d.abs()).collect::<Vec<_>>());
    let rank_sum: f64 = deviations
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();

    let n = oriented.len() as f64;
    let l0 = (4.0 * rank_sum - n * (n + 1.0)) / (2.0 * n - 1.0);
    l0.round().max(0.0) as usize
}

/// 1-based ranks with ties sharing their average rank
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            ranks[idx] = rank;
        }
        start = end + 1;
    }
    ranks
}
