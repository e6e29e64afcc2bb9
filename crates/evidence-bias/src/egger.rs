//! Egger's regression test for funnel-plot asymmetry

use evidence_core::math::distributions::two_sided_t_p;
use evidence_core::{EffectEstimate, Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};

/// Result of regressing standardized effects on precision
///
/// Fits `yᵢ/SEᵢ = β₀ + β₁·(1/SEᵢ)` by ordinary least squares. Under a
/// symmetric funnel the intercept `β₀` is zero; small-study effects push it
/// away from zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EggerTest {
    /// Regression intercept (the asymmetry coefficient)
    pub intercept: f64,
    /// Standard error of the intercept
    pub intercept_se: f64,
    /// Regression slope, an estimate of the underlying effect
    pub slope: f64,
    /// `intercept / intercept_se`
    pub t_value: f64,
    /// `k - 2`
    pub degrees_of_freedom: usize,
    /// Two-sided p-value of the intercept
    pub p_value: f64,
}

impl EggerTest {
    /// Whether the intercept is significant at `alpha`
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Run Egger's test on validated estimates (at least three)
///
/// Fails with a degenerate-result error when every study has the same
/// precision, since the slope is then unidentifiable.
pub fn egger_test(estimates: &[EffectEstimate]) -> Result<EggerTest> {
    let k = estimates.len();
    if k < 3 {
        return Err(Error::insufficient("Egger's test", 3, k));
    }

    let (x, z): (Vec<f64>, Vec<f64>) = estimates
        .iter()
        .map(|est| {
            let se = est.standard_error();
            (1.0 / se, est.estimate / se)
        })
        .unzip();

    let n = k as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let z_mean = z.iter().sum::<f64>() / n;
    let sxx: f64 = x.iter().map(|xi| (xi - x_mean).powi(2)).sum();
    let sxz: f64 = x
        .iter()
        .zip(&z)
        .map(|(xi, zi)| (xi - x_mean) * (zi - z_mean))
        .sum();

    let scale: f64 = x.iter().map(|xi| xi * xi).sum();
    if sxx <= f64::EPSILON * scale {
        return Err(Error::Degenerate {
            context: ErrorContext::field("precision"),
            message: "all studies have the same precision".to_string(),
        });
    }

    let slope = sxz / sxx;
    let intercept = z_mean - slope * x_mean;
    let df = k - 2;
    let rss: f64 = x
        .iter()
        .zip(&z)
        .map(|(xi, zi)| (zi - intercept - slope * xi).powi(2))
        .sum();
    let sigma2 = rss / df as f64;
    let intercept_se = (sigma2 * (1.0 / n + x_mean * x_mean / sxx)).sqrt();

    // A perfect fit leaves no residual variance
    let t_value = if intercept_se > 0.0 {
        intercept / intercept_se
    } else if intercept == 0.0 {
        0.0
    } else {
        intercept.signum() * f64::INFINITY
    };

    Ok(EggerTest {
        intercept,
        intercept_se,
        slope,
        t_value,
        degrees_of_freedom: df,
        p_value: two_sided_t_p(t_value, df as f64)?,
    })
}
