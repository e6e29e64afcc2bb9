//! Input types for network meta-analysis

use evidence_core::{Error, ErrorContext, EffectMeasure, PoolingModel, StudyOutcome, StudyRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome data of a single arm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArmOutcome {
    Binary { events: f64, total: f64 },
    Continuous { mean: f64, sd: f64, n: f64 },
}

/// One arm of a study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentArm {
    pub treatment: String,
    #[serde(flatten)]
    pub outcome: ArmOutcome,
}

impl TreatmentArm {
    pub fn binary(treatment: impl Into<String>, events: f64, total: f64) -> Self {
        Self {
            treatment: treatment.into(),
            outcome: ArmOutcome::Binary { events, total },
        }
    }

    pub fn continuous(treatment: impl Into<String>, mean: f64, sd: f64, n: f64) -> Self {
        Self {
            treatment: treatment.into(),
            outcome: ArmOutcome::Continuous { mean, sd, n },
        }
    }
}

/// A study with two or more arms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStudy {
    #[serde(alias = "id")]
    pub study_id: String,
    pub arms: Vec<TreatmentArm>,
}

impl NetworkStudy {
    pub fn new(study_id: impl Into<String>, arms: Vec<TreatmentArm>) -> Self {
        Self {
            study_id: study_id.into(),
            arms,
        }
    }

    /// More than two arms
    pub fn is_multi_arm(&self) -> bool {
        self.arms.len() > 2
    }
}

impl TryFrom<&StudyRecord> for NetworkStudy {
    type Error = Error;

    /// Convert a labelled two-arm record
    fn try_from(record: &StudyRecord) -> Result<Self, Self::Error> {
        let label = |value: &Option<String>, field: &str| {
            value.clone().ok_or_else(|| Error::InvalidInput {
                context: ErrorContext::study(&record.study_id).with_field(field),
                message: "network analysis needs a treatment label per arm".to_string(),
            })
        };
        let treatment = label(&record.treatment, "treatment")?;
        let comparator = label(&record.comparator, "comparator")?;

        let arms = match record.outcome {
            StudyOutcome::Binary {
                events_treatment,
                total_treatment,
                events_control,
                total_control,
            } => vec![
                TreatmentArm::binary(treatment, events_treatment, total_treatment),
                TreatmentArm::binary(comparator, events_control, total_control),
            ],
            StudyOutcome::Continuous {
                mean_t,
                sd_t,
                n_t,
                mean_c,
                sd_c,
                n_c,
            } => vec![
                TreatmentArm::continuous(treatment, mean_t, sd_t, n_t),
                TreatmentArm::continuous(comparator, mean_c, sd_c, n_c),
            ],
        };

        Ok(Self::new(record.study_id.clone(), arms))
    }
}

/// Which end of the effect scale counts as better when ranking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeDirection {
    /// Larger effects are better (e.g. response rates, symptom improvement)
    #[default]
    HigherIsBetter,
    /// Smaller effects are better (e.g. mortality, adverse events)
    LowerIsBetter,
}

impl OutcomeDirection {
    /// Sign that turns an effect into a "higher is better" utility
    pub fn sign(&self) -> f64 {
        match self {
            Self::HigherIsBetter => 1.0,
            Self::LowerIsBetter => -1.0,
        }
    }
}

impl fmt::Display for OutcomeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HigherIsBetter => write!(f, "higher is better"),
            Self::LowerIsBetter => write!(f, "lower is better"),
        }
    }
}

/// What to estimate and how to rank
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkOptions {
    pub measure: EffectMeasure,
    #[serde(default)]
    pub model: PoolingModel,
    #[serde(default)]
    pub direction: OutcomeDirection,
}

impl NetworkOptions {
    pub fn new(measure: EffectMeasure) -> Self {
        Self {
            measure,
            model: PoolingModel::default(),
            direction: OutcomeDirection::default(),
        }
    }

    pub fn model(mut self, model: PoolingModel) -> Self {
        self.model = model;
        self
    }

    pub fn direction(mut self, direction: OutcomeDirection) -> Self {
        self.direction = direction;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_converts_to_two_arms() {
        let record = StudyRecord::binary("S1", 12.0, 100.0, 20.0, 100.0).with_treatments("B", "A");
        let study = NetworkStudy::try_from(&record).unwrap();
        assert_eq!(study.arms.len(), 2);
        assert_eq!(study.arms[0].treatment, "B");
        assert_eq!(study.arms[1].outcome, ArmOutcome::Binary { events: 20.0, total: 100.0 });
        assert!(!study.is_multi_arm());
    }

    #[test]
    fn test_unlabelled_record_rejected() {
        let record = StudyRecord::binary("S1", 12.0, 100.0, 20.0, 100.0);
        let err = NetworkStudy::try_from(&record).unwrap_err();
        assert!(err.to_string().contains("treatment"));
    }

    #[test]
    fn test_arm_deserializes_untagged() {
        let arm: TreatmentArm =
            serde_json::from_str(r#"{"treatment":"A","mean":1.5,"sd":0.4,"n":30}"#).unwrap();
        assert_eq!(arm.outcome, ArmOutcome::Continuous { mean: 1.5, sd: 0.4, n: 30.0 });
    }
}
