//! Continuous-outcome effect sizes: mean difference and Hedges' g
//!
//! Hedges' g is a bias-corrected version of Cohen's d that provides a less
//! biased estimate of the standardized mean difference in small samples.

use evidence_core::{EffectEstimate, EffectMeasure, Error, ErrorContext, Result};

/// Validated summary statistics of a two-arm continuous outcome
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmSummaries {
    pub mean_t: f64,
    pub sd_t: f64,
    pub n_t: f64,
    pub mean_c: f64,
    pub sd_c: f64,
    pub n_c: f64,
}

impl ArmSummaries {
    /// Validate means, standard deviations and group sizes
    pub fn new(
        study_id: &str,
        mean_t: f64,
        sd_t: f64,
        n_t: f64,
        mean_c: f64,
        sd_c: f64,
        n_c: f64,
    ) -> Result<Self> {
        let fields = [
            ("mean_t", mean_t),
            ("sd_t", sd_t),
            ("n_t", n_t),
            ("mean_c", mean_c),
            ("sd_c", sd_c),
            ("n_c", n_c),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(Error::invalid_field(study_id, field, "must be a finite number"));
            }
        }
        for (field, sd) in [("sd_t", sd_t), ("sd_c", sd_c)] {
            if sd < 0.0 {
                return Err(Error::invalid_field(
                    study_id,
                    field,
                    format!("standard deviation {sd} must be non-negative"),
                ));
            }
        }
        for (field, n) in [("n_t", n_t), ("n_c", n_c)] {
            if n < 1.0 {
                return Err(Error::invalid_field(
                    study_id,
                    field,
                    format!("sample size {n} must be at least 1"),
                ));
            }
        }

        Ok(Self {
            mean_t,
            sd_t,
            n_t,
            mean_c,
            sd_c,
            n_c,
        })
    }

    /// Mean difference with `Var = sd1²/n1 + sd2²/n2`
    pub fn mean_difference(&self, study_id: &str) -> EffectEstimate {
        let variance = self.sd_t.powi(2) / self.n_t + self.sd_c.powi(2) / self.n_c;
        EffectEstimate::new(
            study_id,
            self.mean_t - self.mean_c,
            variance,
            EffectMeasure::MeanDifference,
        )
    }

    /// Pooled standard deviation across both arms
    pub fn pooled_sd(&self) -> f64 {
        let df = self.n_t + self.n_c - 2.0;
        (((self.n_t - 1.0) * self.sd_t.powi(2) + (self.n_c - 1.0) * self.sd_c.powi(2)) / df)
            .sqrt()
    }

    /// Hedges' g
    ///
    /// g = J · d, where d is Cohen's d on the pooled SD and
    /// J = 1 - 3/(4(n₁ + n₂) - 9). The variance is
    /// J² · ((n₁ + n₂)/(n₁n₂) + d²/(2(n₁ + n₂))).
    pub fn hedges_g(&self, study_id: &str) -> Result<EffectEstimate> {
        let total = self.n_t + self.n_c;
        if total <= 2.0 {
            return Err(Error::Degenerate {
                context: ErrorContext::study(study_id),
                message: "standardized mean difference needs more than two participants"
                    .to_string(),
            });
        }
        let sd = self.pooled_sd();
        if !(sd > 0.0) {
            return Err(Error::Degenerate {
                context: ErrorContext::study(study_id).with_field("sd_t"),
                message: "pooled standard deviation is zero; SMD is undefined".to_string(),
            });
        }

        let d = (self.mean_t - self.mean_c) / sd;
        let j = bias_correction_factor(total);
        let var_d = total / (self.n_t * self.n_c) + d.powi(2) / (2.0 * total);

        Ok(EffectEstimate::new(
            study_id,
            j * d,
            j.powi(2) * var_d,
            EffectMeasure::StandardizedMeanDifference,
        ))
    }
}

/// Small-sample bias correction J ≈ 1 - 3/(4N - 9)
pub fn bias_correction_factor(total_n: f64) -> f64 {
    1.0 - 3.0 / (4.0 * total_n - 9.0)
}
