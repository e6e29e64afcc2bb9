//! Begg and Mazumdar's rank correlation test

use evidence_core::math::distributions::two_sided_normal_p;
use evidence_core::{EffectEstimate, Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};

/// Kendall rank correlation between standardized effects and variances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeggTest {
    /// Kendall's tau
    pub kendall_tau: f64,
    /// Concordant minus discordant pairs
    pub score: i64,
    /// Normal approximation of the score
    pub z_value: f64,
    /// Two-sided p-value
    pub p_value: f64,
}

/// Run Begg's test on validated estimates (at least three)
///
/// Each effect is centred on the fixed-effect mean and divided by the
/// standard deviation of that difference, `sqrt(vᵢ - 1/Σw)`. Tied pairs
/// count as neither concordant nor discordant.
pub fn begg_test(estimates: &[EffectEstimate]) -> Result<BeggTest> {
    let k = estimates.len();
    if k < 3 {
        return Err(Error::insufficient("Begg's test", 3, k));
    }

    let sum_w: f64 = estimates.iter().map(|est| 1.0 / est.variance).sum();
    let mean = estimates
        .iter()
        .map(|est| est.estimate / est.variance)
        .sum::<f64>()
        / sum_w;

    let standardized = estimates
        .iter()
        .map(|est| {
            let residual_variance = est.variance - 1.0 / sum_w;
            if residual_variance > 0.0 {
                Ok((est.estimate - mean) / residual_variance.sqrt())
            } else {
                Err(Error::Degenerate {
                    context: ErrorContext::study(&est.study_id).with_field("variance"),
                    message: "study carries all the weight of the set".to_string(),
                })
            }
        })
        .collect::<Result<Vec<f64>>>()?;

    let mut score: i64 = 0;
    for i in 0..k {
        for j in (i + 1)..k {
            let sign = (standardized[i] - standardized[j])
                * (estimates[i].variance - estimates[j].variance);
            if sign > 0.0 {
                score += 1;
            } else if sign < 0.0 {
                score -= 1;
            }
        }
    }

    let n = k as f64;
    let pairs = n * (n - 1.0) / 2.0;
    let z_value = score as f64 / (n * (n - 1.0) * (2.0 * n + 5.0) / 18.0).sqrt();

    Ok(BeggTest {
        kendall_tau: score as f64 / pairs,
        score,
        z_value,
        p_value: two_sided_normal_p(z_value)?,
    })
}
