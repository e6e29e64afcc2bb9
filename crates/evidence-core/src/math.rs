//! Distribution helpers for confidence intervals and hypothesis tests
//!
//! Thin wrappers over `statrs` that validate their arguments and report
//! construction failures through the crate error type.

/// Distribution-related mathematical functions
pub mod distributions {
    use crate::{Error, Result};
    use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};

    fn standard_normal() -> Result<Normal> {
        Normal::new(0.0, 1.0).map_err(|e| {
            Error::Computation(format!("Failed to create normal distribution: {}", e))
        })
    }

    fn students_t(df: f64) -> Result<StudentsT> {
        if !(df > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "t-distribution needs positive degrees of freedom, got {df}"
            )));
        }
        StudentsT::new(0.0, 1.0, df)
            .map_err(|e| Error::Computation(format!("Failed to create t-distribution: {}", e)))
    }

    fn check_alpha(alpha: f64) -> Result<()> {
        if alpha > 0.0 && alpha < 1.0 {
            Ok(())
        } else {
            Err(Error::InvalidParameter(format!(
                "alpha {alpha} must be in (0, 1)"
            )))
        }
    }

    /// Standard normal CDF
    pub fn normal_cdf(x: f64) -> Result<f64> {
        if x.is_nan() {
            return Err(Error::non_finite("normal deviate"));
        }
        Ok(standard_normal()?.cdf(x))
    }

    /// Critical value `z(1 - alpha/2)`
    pub fn z_critical(alpha: f64) -> Result<f64> {
        check_alpha(alpha)?;
        Ok(standard_normal()?.inverse_cdf(1.0 - alpha / 2.0))
    }

    /// Two-sided p-value of a standard normal statistic
    pub fn two_sided_normal_p(z: f64) -> Result<f64> {
        if z.is_nan() {
            return Err(Error::non_finite("z statistic"));
        }
        if z.is_infinite() {
            return Ok(0.0);
        }
        // Lower tail of -|z| keeps precision far out in the tail
        let p = 2.0 * standard_normal()?.cdf(-z.abs());
        Ok(p.clamp(0.0, 1.0))
    }

    /// Critical value `t(1 - alpha/2, df)`
    pub fn t_critical(alpha: f64, df: f64) -> Result<f64> {
        check_alpha(alpha)?;
        Ok(students_t(df)?.inverse_cdf(1.0 - alpha / 2.0))
    }

    /// Two-sided p-value of a t statistic
    pub fn two_sided_t_p(t: f64, df: f64) -> Result<f64> {
        if t.is_nan() {
            return Err(Error::non_finite("t statistic"));
        }
        if t.is_infinite() {
            return Ok(0.0);
        }
        let p = 2.0 * students_t(df)?.cdf(-t.abs());
        Ok(p.clamp(0.0, 1.0))
    }

    /// Upper-tail probability of a chi-square statistic
    pub fn chi_squared_upper_tail(q: f64, df: f64) -> Result<f64> {
        if q.is_nan() {
            return Err(Error::non_finite("chi-square statistic"));
        }
        if !(df > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "chi-square needs positive degrees of freedom, got {df}"
            )));
        }
        if q <= 0.0 {
            return Ok(1.0);
        }
        let chi = ChiSquared::new(df).map_err(|e| {
            Error::Computation(format!("Failed to create chi-square distribution: {}", e))
        })?;
        Ok((1.0 - chi.cdf(q)).clamp(0.0, 1.0))
    }

}
