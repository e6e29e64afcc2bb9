//! Shared data model: study records, effect measures and effect estimates

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Standardized effect measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectMeasure {
    /// Odds ratio (combined on the log scale)
    #[serde(rename = "OR", alias = "or", alias = "odds_ratio")]
    OddsRatio,
    /// Risk ratio (combined on the log scale)
    #[serde(rename = "RR", alias = "rr", alias = "risk_ratio")]
    RiskRatio,
    /// Risk difference
    #[serde(rename = "RD", alias = "rd", alias = "risk_difference")]
    RiskDifference,
    /// Standardized mean difference (Hedges' g)
    #[serde(rename = "SMD", alias = "smd", alias = "hedges_g")]
    StandardizedMeanDifference,
    /// Raw mean difference
    #[serde(rename = "MD", alias = "md", alias = "mean_difference")]
    MeanDifference,
}

impl EffectMeasure {
    /// Short label used in reports
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::OddsRatio => "OR",
            Self::RiskRatio => "RR",
            Self::RiskDifference => "RD",
            Self::StandardizedMeanDifference => "SMD",
            Self::MeanDifference => "MD",
        }
    }

    /// Get the name of the measure
    pub fn name(&self) -> &'static str {
        match self {
            Self::OddsRatio => "Odds Ratio",
            Self::RiskRatio => "Risk Ratio",
            Self::RiskDifference => "Risk Difference",
            Self::StandardizedMeanDifference => "Standardized Mean Difference",
            Self::MeanDifference => "Mean Difference",
        }
    }

    /// Whether estimates are combined on the log scale
    pub fn is_log_scale(&self) -> bool {
        matches!(self, Self::OddsRatio | Self::RiskRatio)
    }

    /// Whether the measure needs 2x2 count data
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::OddsRatio | Self::RiskRatio | Self::RiskDifference)
    }

    /// Value of "no effect" on the reporting scale
    pub fn null_value(&self) -> f64 {
        if self.is_log_scale() {
            1.0
        } else {
            0.0
        }
    }

    /// Map a value from the analysis scale to the reporting scale
    pub fn to_reporting_scale(&self, value: f64) -> f64 {
        if self.is_log_scale() {
            value.exp()
        } else {
            value
        }
    }
}

impl fmt::Display for EffectMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Pooling model selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolingModel {
    /// Inverse-variance fixed effect
    #[default]
    #[serde(alias = "fixed_effect", alias = "common")]
    Fixed,
    /// DerSimonian-Laird random effects
    #[serde(alias = "random_effects")]
    Random,
}

impl fmt::Display for PoolingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Random => write!(f, "random"),
        }
    }
}

/// Two-arm outcome data for one study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StudyOutcome {
    /// Event counts per arm
    Binary {
        events_treatment: f64,
        total_treatment: f64,
        events_control: f64,
        total_control: f64,
    },
    /// Summary statistics per arm
    Continuous {
        mean_t: f64,
        sd_t: f64,
        n_t: f64,
        mean_c: f64,
        sd_c: f64,
        n_c: f64,
    },
}

impl StudyOutcome {
    /// Whether this outcome carries event counts
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary { .. })
    }
}

/// Study-level covariate value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Covariate {
    Flag(bool),
    Numeric(f64),
    Categorical(String),
}

impl fmt::Display for Covariate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(value) => write!(f, "{value}"),
            Self::Numeric(value) => write!(f, "{value}"),
            Self::Categorical(value) => write!(f, "{value}"),
        }
    }
}

/// One study's contribution to one comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyRecord {
    /// Study identifier
    #[serde(alias = "id")]
    pub study_id: String,
    /// Arm-level data
    #[serde(flatten)]
    pub outcome: StudyOutcome,
    /// Label of the experimental arm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
    /// Label of the comparator arm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator: Option<String>,
    /// Study-level covariates
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub covariates: BTreeMap<String, Covariate>,
}

impl StudyRecord {
    /// Create a record from 2x2 counts
    pub fn binary(
        study_id: impl Into<String>,
        events_treatment: f64,
        total_treatment: f64,
        events_control: f64,
        total_control: f64,
    ) -> Self {
        Self::new(
            study_id,
            StudyOutcome::Binary {
                events_treatment,
                total_treatment,
                events_control,
                total_control,
            },
        )
    }

    /// Create a record from per-arm means, standard deviations and sizes
    #[allow(clippy::too_many_arguments)]
    pub fn continuous(
        study_id: impl Into<String>,
        mean_t: f64,
        sd_t: f64,
        n_t: f64,
        mean_c: f64,
        sd_c: f64,
        n_c: f64,
    ) -> Self {
        Self::new(
            study_id,
            StudyOutcome::Continuous {
                mean_t,
                sd_t,
                n_t,
                mean_c,
                sd_c,
                n_c,
            },
        )
    }

    fn new(study_id: impl Into<String>, outcome: StudyOutcome) -> Self {
        Self {
            study_id: study_id.into(),
            outcome,
            treatment: None,
            comparator: None,
            covariates: BTreeMap::new(),
        }
    }

    /// Label the two arms
    pub fn with_treatments(
        mut self,
        treatment: impl Into<String>,
        comparator: impl Into<String>,
    ) -> Self {
        self.treatment = Some(treatment.into());
        self.comparator = Some(comparator.into());
        self
    }

    /// Attach a covariate
    pub fn with_covariate(mut self, name: impl Into<String>, value: Covariate) -> Self {
        self.covariates.insert(name.into(), value);
        self
    }
}

/// Standardized effect estimate of one study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectEstimate {
    /// Study identifier
    pub study_id: String,
    /// Point estimate on the analysis scale
    pub estimate: f64,
    /// Sampling variance on the analysis scale
    pub variance: f64,
    /// Whether `estimate` is a log ratio
    pub log_scale: bool,
    /// Effect measure
    pub measure: EffectMeasure,
    /// Whether a zero-cell continuity correction was applied
    #[serde(default)]
    pub continuity_corrected: bool,
}

impl EffectEstimate {
    /// Create an estimate; the scale follows the measure
    pub fn new(
        study_id: impl Into<String>,
        estimate: f64,
        variance: f64,
        measure: EffectMeasure,
    ) -> Self {
        Self {
            study_id: study_id.into(),
            estimate,
            variance,
            log_scale: measure.is_log_scale(),
            measure,
            continuity_corrected: false,
        }
    }

    /// Standard error
    pub fn standard_error(&self) -> f64 {
        self.variance.sqrt()
    }

    /// Inverse standard error
    pub fn precision(&self) -> f64 {
        1.0 / self.standard_error()
    }

    /// Zero or non-finite variance cannot be inverse-variance weighted
    pub fn is_degenerate(&self) -> bool {
        !(self.variance.is_finite() && self.variance > 0.0)
    }

    /// Point estimate on the reporting scale
    pub fn reporting_estimate(&self) -> f64 {
        if self.log_scale {
            self.estimate.exp()
        } else {
            self.estimate
        }
    }
}

impl fmt::Display for EffectEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} = {:.3} (var {:.4})",
            self.study_id,
            self.measure,
            self.reporting_estimate(),
            self.variance
        )
    }
}

/// A confidence interval with lower and upper bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound of the interval
    pub lower: f64,
    /// Upper bound of the interval
    pub upper: f64,
    /// Confidence level (e.g., 0.95 for 95% CI)
    pub level: f64,
}

impl ConfidenceInterval {
    /// Create a new confidence interval
    pub fn new(lower: f64, upper: f64, level: f64) -> Self {
        Self {
            lower,
            upper,
            level,
        }
    }

    /// Symmetric interval around a center
    pub fn symmetric(center: f64, margin: f64, level: f64) -> Self {
        Self::new(center - margin, center + margin, level)
    }

    /// Map both bounds, e.g. exponentiate a log-scale interval
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.lower), f(self.upper), self.level)
    }

    /// Width of the confidence interval
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Check if a value is contained in the interval
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

impl fmt::Display for ConfidenceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1}% CI: [{:.4}, {:.4}]",
            self.level * 100.0,
            self.lower,
            self.upper
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_scales() {
        assert!(EffectMeasure::OddsRatio.is_log_scale());
        assert!(EffectMeasure::RiskRatio.is_log_scale());
        assert!(!EffectMeasure::RiskDifference.is_log_scale());
        assert!(!EffectMeasure::StandardizedMeanDifference.is_binary());
        assert_eq!(EffectMeasure::OddsRatio.null_value(), 1.0);
        assert_eq!(EffectMeasure::MeanDifference.null_value(), 0.0);
    }

    #[test]
    fn test_measure_serde_names() {
        let measure: EffectMeasure = serde_json::from_str("\"SMD\"").unwrap();
        assert_eq!(measure, EffectMeasure::StandardizedMeanDifference);
        let measure: EffectMeasure = serde_json::from_str("\"or\"").unwrap();
        assert_eq!(measure, EffectMeasure::OddsRatio);
        assert_eq!(serde_json::to_string(&EffectMeasure::RiskRatio).unwrap(), "\"RR\"");
    }

    #[test]
    fn test_study_record_from_json() {
        let binary: StudyRecord = serde_json::from_str(
            r#"{"study_id": "A", "events_treatment": 10, "total_treatment": 100,
                "events_control": 5, "total_control": 100}"#,
        )
        .unwrap();
        assert!(binary.outcome.is_binary());

        let continuous: StudyRecord = serde_json::from_str(
            r#"{"id": "B", "mean_t": 5.0, "sd_t": 1.0, "n_t": 20,
                "mean_c": 4.0, "sd_c": 1.2, "n_c": 22,
                "covariates": {"region": "EU", "year": 2019}}"#,
        )
        .unwrap();
        assert_eq!(continuous.study_id, "B");
        assert!(!continuous.outcome.is_binary());
        assert_eq!(
            continuous.covariates.get("region"),
            Some(&Covariate::Categorical("EU".to_string()))
        );
    }

    #[test]
    fn test_estimate_helpers() {
        let est = EffectEstimate::new("S1", 0.0_f64.ln_1p(), 0.25, EffectMeasure::OddsRatio);
        assert!(est.log_scale);
        assert_eq!(est.standard_error(), 0.5);
        assert_eq!(est.precision(), 2.0);
        assert!(!est.is_degenerate());
        assert_eq!(est.reporting_estimate(), 1.0);

        let flat = EffectEstimate::new("S2", 1.0, 0.0, EffectMeasure::MeanDifference);
        assert!(flat.is_degenerate());
    }

    #[test]
    fn test_confidence_interval() {
        let ci = ConfidenceInterval::symmetric(5.0, 3.0, 0.95);
        assert_eq!(ci.width(), 6.0);
        assert!(ci.contains(5.0));
        assert!(!ci.contains(9.0));

        let display = format!("{}", ci);
        assert!(display.contains("95.0%"));
        assert!(display.contains("2.0000"));

        let exp = ConfidenceInterval::new(0.0, 1.0, 0.95).map(f64::exp);
        assert_eq!(exp.lower, 1.0);
    }
}
