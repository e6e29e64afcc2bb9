//! Dispatch from a study record and a requested measure to the right formula

use crate::binary::TwoByTwo;
use crate::continuous::ArmSummaries;
use evidence_core::{
    AnalysisConfig, EffectEstimate, EffectMeasure, Error, ErrorContext, Result, StudyOutcome,
    StudyRecord,
};
use tracing::debug;

/// Converts study records into standardized effect estimates
#[derive(Debug, Clone, Copy)]
pub struct EffectSizeCalculator {
    continuity_correction: f64,
}

impl EffectSizeCalculator {
    /// Create a calculator using the correction from `config`
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            continuity_correction: config.continuity_correction,
        }
    }

    /// Compute one study's effect estimate
    pub fn calculate(&self, study: &StudyRecord, measure: EffectMeasure) -> Result<EffectEstimate> {
        let id = study.study_id.as_str();
        if id.trim().is_empty() {
            return Err(Error::InvalidInput {
                context: ErrorContext::field("study_id"),
                message: "study identifier must not be empty".to_string(),
            });
        }

        let estimate = match (&study.outcome, measure) {
            (
                StudyOutcome::Binary {
                    events_treatment,
                    total_treatment,
                    events_control,
                    total_control,
                },
                EffectMeasure::OddsRatio | EffectMeasure::RiskRatio | EffectMeasure::RiskDifference,
            ) => {
                let table = TwoByTwo::from_counts(
                    id,
                    *events_treatment,
                    *total_treatment,
                    *events_control,
                    *total_control,
                )?;
                let correction = self.continuity_correction;
                match measure {
                    EffectMeasure::OddsRatio => table.log_odds_ratio(id, correction),
                    EffectMeasure::RiskRatio => table.log_risk_ratio(id, correction),
                    _ => table.risk_difference(id),
                }
            }
            (
                StudyOutcome::Continuous {
                    mean_t,
                    sd_t,
                    n_t,
                    mean_c,
                    sd_c,
                    n_c,
                },
                EffectMeasure::MeanDifference | EffectMeasure::StandardizedMeanDifference,
            ) => {
                let arms = ArmSummaries::new(id, *mean_t, *sd_t, *n_t, *mean_c, *sd_c, *n_c)?;
                if measure == EffectMeasure::MeanDifference {
                    arms.mean_difference(id)
                } else {
                    arms.hedges_g(id)?
                }
            }
            (outcome, measure) => {
                let kind = if outcome.is_binary() { "binary" } else { "continuous" };
                return Err(Error::invalid_field(
                    id,
                    "measure",
                    format!("{measure} cannot be computed from {kind} outcome data"),
                ));
            }
        };

        if estimate.continuity_corrected {
            debug!(study = id, %measure, "applied zero-cell continuity correction");
        }
        if estimate.is_degenerate() {
            debug!(study = id, %measure, "study has zero sampling variance");
        }
        Ok(estimate)
    }

    /// Compute estimates for a batch, failing on the first invalid study
    pub fn calculate_all(
        &self,
        studies: &[StudyRecord],
        measure: EffectMeasure,
    ) -> Result<Vec<EffectEstimate>> {
        studies
            .iter()
            .map(|study| self.calculate(study, measure))
            .collect()
    }
}
