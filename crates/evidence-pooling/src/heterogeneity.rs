//! Between-study heterogeneity: Cochran's Q, I², H and the DerSimonian-Laird τ²

use crate::validate::split_zero_variance;
use evidence_core::math::distributions::chi_squared_upper_tail;
use evidence_core::{EffectEstimate, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Heterogeneity statistics of a set of effect estimates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeterogeneityStats {
    /// Cochran's Q
    pub q: f64,
    /// k - 1
    pub degrees_of_freedom: usize,
    /// Upper-tail chi-square p-value of Q
    pub p_value: f64,
    /// DerSimonian-Laird between-study variance, never negative
    pub tau_squared: f64,
    /// Square root of `tau_squared`
    pub tau: f64,
    /// Percentage of variability beyond chance, in [0, 100]
    pub i_squared: f64,
    /// sqrt(Q/df); `None` when df = 0
    pub h: Option<f64>,
    /// Zero-variance studies left out of every sum
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_studies: Vec<String>,
}

impl HeterogeneityStats {
    /// Whether Q is significant at `alpha`
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }

    /// Whether H is defined (df > 0)
    pub fn h_defined(&self) -> bool {
        self.h.is_some()
    }
}

impl fmt::Display for HeterogeneityStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Q = {:.2} (df = {}, p = {:.4}), I² = {:.1}%, τ² = {:.4}",
            self.q, self.degrees_of_freedom, self.p_value, self.i_squared, self.tau_squared
        )
    }
}

/// Quantify between-study variability; needs at least two weightable estimates
///
/// Zero-variance studies are left out and listed in `excluded_studies`.
pub fn assess_heterogeneity(estimates: &[EffectEstimate]) -> Result<HeterogeneityStats> {
    let split = split_zero_variance(estimates, "heterogeneity analysis", 2)?;
    let mut stats = compute(&split.usable)?;
    stats.excluded_studies = split.zero_variance;
    Ok(stats)
}

/// Heterogeneity of an already-validated set (k >= 1)
pub(crate) fn compute(estimates: &[EffectEstimate]) -> Result<HeterogeneityStats> {
    let k = estimates.len();
    let mut sum_w = 0.0;
    let mut sum_w2 = 0.0;
    let mut sum_wy = 0.0;
    for est in estimates {
        let w = 1.0 / est.variance;
        sum_w += w;
        sum_w2 += w * w;
        sum_wy += w * est.estimate;
    }
    let fixed = sum_wy / sum_w;

    let q: f64 = estimates
        .iter()
        .map(|est| (est.estimate - fixed).powi(2) / est.variance)
        .sum();
    let df = k.saturating_sub(1);
    let df_f = df as f64;

    let c = sum_w - sum_w2 / sum_w;
    let tau_squared = if c > 0.0 {
        ((q - df_f) / c).max(0.0)
    } else {
        0.0
    };
    let i_squared = if q > 0.0 {
        (((q - df_f) / q).max(0.0) * 100.0).min(100.0)
    } else {
        0.0
    };
    let (h, p_value) = if df > 0 {
        (Some((q / df_f).sqrt()), chi_squared_upper_tail(q, df_f)?)
    } else {
        (None, 1.0)
    };

    Ok(HeterogeneityStats {
        q,
        degrees_of_freedom: df,
        p_value,
        tau_squared,
        tau: tau_squared.sqrt(),
        i_squared,
        h,
        excluded_studies: Vec::new(),
    })
}
