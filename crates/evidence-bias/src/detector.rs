//! Publication-bias detection over a pooled set

use crate::begg::{begg_test, BeggTest};
use crate::egger::{egger_test, EggerTest};
use evidence_core::{AnalysisConfig, EffectEstimate, Error, Result};
use evidence_pooling::split_zero_variance;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

const MIN_STUDIES: usize = 3;

/// One funnel-plot point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelPoint {
    pub study_id: String,
    /// Effect on the analysis scale
    pub estimate: f64,
    /// `1/SE`
    pub precision: f64,
}

/// Why one or both asymmetry tests were omitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BiasWarning {
    /// Too few studies for either test
    LowPower { studies: usize, required: usize },
    /// Every study has the same precision, so Egger's regression is undefined
    DegenerateRegression,
    /// One study carries effectively all the weight, so Begg's test is undefined
    DegenerateRankCorrelation,
    /// Studies with zero variance were left out of both tests
    ZeroVarianceExcluded { studies: Vec<String> },
}

impl fmt::Display for BiasWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiasWarning::LowPower { studies, required } => write!(
                f,
                "asymmetry tests need at least {required} studies, got {studies}"
            ),
            BiasWarning::DegenerateRegression => {
                write!(f, "all studies share one precision; Egger's test omitted")
            }
            BiasWarning::DegenerateRankCorrelation => {
                write!(f, "one study dominates the weights; Begg's test omitted")
            }
            BiasWarning::ZeroVarianceExcluded { studies } => {
                write!(f, "zero-variance studies left out: {}", studies.join(", "))
            }
        }
    }
}

/// Funnel-plot asymmetry assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationBiasResult {
    pub egger: Option<EggerTest>,
    pub begg: Option<BeggTest>,
    /// Egger's intercept is significant at `bias_alpha`
    pub is_asymmetric: bool,
    /// Points in input order, zero-variance studies left out
    pub funnel_points: Vec<FunnelPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<BiasWarning>,
}

impl PublicationBiasResult {
    pub fn egger_intercept(&self) -> Option<f64> {
        self.egger.map(|e| e.intercept)
    }

    pub fn egger_p_value(&self) -> Option<f64> {
        self.egger.map(|e| e.p_value)
    }

    pub fn begg_p_value(&self) -> Option<f64> {
        self.begg.map(|b| b.p_value)
    }

    /// Whether both tests ran
    pub fn is_complete(&self) -> bool {
        self.egger.is_some() && self.begg.is_some()
    }

    pub fn has_warning(&self, warning: &BiasWarning) -> bool {
        self.warnings.contains(warning)
    }
}

/// Test a set of estimates for funnel-plot asymmetry
///
/// With fewer than three studies the tests are omitted and a
/// [`BiasWarning::LowPower`] is attached; funnel points are still returned.
/// A test that is undefined for the set is omitted with a warning while the
/// other one still runs.
pub fn detect_publication_bias(
    estimates: &[EffectEstimate],
    config: &AnalysisConfig,
) -> Result<PublicationBiasResult> {
    config.validate()?;
    let split = split_zero_variance(estimates, "publication bias detection", 1)?;
    let estimates = split.usable.as_slice();
    let mut warnings = Vec::new();
    if !split.zero_variance.is_empty() {
        warnings.push(BiasWarning::ZeroVarianceExcluded {
            studies: split.zero_variance.clone(),
        });
    }

    let funnel_points: Vec<FunnelPoint> = estimates
        .iter()
        .map(|est| FunnelPoint {
            study_id: est.study_id.clone(),
            estimate: est.estimate,
            precision: est.precision(),
        })
        .collect();

    if estimates.len() < MIN_STUDIES {
        warn!(
            studies = estimates.len(),
            "too few studies for asymmetry tests"
        );
        warnings.push(BiasWarning::LowPower {
            studies: estimates.len(),
            required: MIN_STUDIES,
        });
        return Ok(PublicationBiasResult {
            egger: None,
            begg: None,
            is_asymmetric: false,
            funnel_points,
            warnings,
        });
    }

    let egger = match egger_test(estimates) {
        Ok(egger) => Some(egger),
        Err(Error::Degenerate { .. }) => {
            warn!("Egger regression undefined for equal precisions");
            warnings.push(BiasWarning::DegenerateRegression);
            None
        }
        Err(e) => return Err(e),
    };
    let begg = match begg_test(estimates) {
        Ok(begg) => Some(begg),
        Err(Error::Degenerate { context, .. }) => {
            warn!(study = ?context.study_id, "Begg rank correlation undefined");
            warnings.push(BiasWarning::DegenerateRankCorrelation);
            None
        }
        Err(e) => return Err(e),
    };
    let is_asymmetric = egger.map_or(false, |e| e.is_significant(config.bias_alpha));

    debug!(
        egger_p = ?egger.map(|e| e.p_value),
        begg_p = ?begg.map(|b| b.p_value),
        is_asymmetric,
        "publication bias assessed"
    );

    Ok(PublicationBiasResult {
        egger,
        begg,
        is_asymmetric,
        funnel_points,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use evidence_core::EffectMeasure;

    fn est(id: &str, y: f64, v: f64) -> EffectEstimate {
        EffectEstimate::new(id, y, v, EffectMeasure::MeanDifference)
    }

    #[test]
    fn test_two_studies_low_power() {
        let set = vec![est("a", 0.3, 0.04), est("b", 0.1, 0.25)];
        let result = detect_publication_bias(&set, &AnalysisConfig::default()).unwrap();
        assert!(!result.is_asymmetric);
        assert!(result.egger_p_value().is_none());
        assert!(result.begg_p_value().is_none());
        assert_eq!(
            result.warnings,
            vec![BiasWarning::LowPower { studies: 2, required: 3 }]
        );
        assert_eq!(result.funnel_points[0].study_id, "a");
        assert!((result.funnel_points[0].precision - 5.0).abs() < 1e-12);
        assert!((result.funnel_points[1].precision - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_equal_precision_keeps_begg() {
        let set = vec![est("a", 0.3, 0.1), est("b", 0.1, 0.1), est("c", 0.5, 0.1)];
        let result = detect_publication_bias(&set, &AnalysisConfig::default()).unwrap();
        assert_eq!(result.warnings, vec![BiasWarning::DegenerateRegression]);
        assert!(result.egger.is_none());
        assert!(result.begg.is_some());
        assert!(!result.is_asymmetric);
    }

    #[test]
    fn test_dominant_study_keeps_egger() {
        // The first study's variance equals 1/Σw exactly, leaving no residual variance
        let set = vec![
            est("tight", 0.1, 1e-20),
            est("b", 0.5, 1e20),
            est("c", -0.2, 2e20),
            est("d", 0.3, 3e20),
        ];
        let result = detect_publication_bias(&set, &AnalysisConfig::default()).unwrap();
        assert!(result.begg.is_none());
        assert!(result.egger.is_some());
        assert_eq!(result.warnings, vec![BiasWarning::DegenerateRankCorrelation]);
        assert_eq!(result.funnel_points.len(), 4);
    }

    #[test]
    fn test_zero_variance_study_left_out() {
        let set = vec![
            est("a", 0.3, 0.04),
            est("flat", 0.0, 0.0),
            est("b", 0.1, 0.25),
            est("c", 0.5, 0.09),
        ];
        let result = detect_publication_bias(&set, &AnalysisConfig::default()).unwrap();
        let ids: Vec<&str> =
            result.funnel_points.iter().map(|p| p.study_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(result.is_complete());
        assert!(result.has_warning(&BiasWarning::ZeroVarianceExcluded {
            studies: vec!["flat".to_string()],
        }));
    }

    #[test]
    fn test_empty_set_is_an_error() {
        let err = detect_publication_bias(&[], &AnalysisConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "InsufficientDataError");
    }
}
