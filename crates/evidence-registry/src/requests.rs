//! JSON argument shapes accepted by the registered operations

use evidence_core::{AnalysisConfig, EffectMeasure, PoolingModel, Result, StudyRecord};
use evidence_network::{NetworkOptions, NetworkStudy, OutcomeDirection};
use evidence_plot::{PrismaCounts, RiskJudgements};
use serde::Deserialize;

/// Apply per-request overrides on top of the caller's configuration
pub(crate) fn request_config(
    base: &AnalysisConfig,
    alpha: Option<f64>,
    hartung_knapp: Option<bool>,
) -> Result<AnalysisConfig> {
    let mut config = *base;
    if let Some(alpha) = alpha {
        config = config.alpha(alpha);
    }
    if let Some(enabled) = hartung_knapp {
        config = config.hartung_knapp(enabled);
    }
    config.validate()?;
    Ok(config)
}

#[derive(Debug, Clone, Deserialize)]
pub struct EffectSizeRequest {
    pub measure: EffectMeasure,
    pub studies: Vec<StudyRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolRequest {
    pub measure: EffectMeasure,
    #[serde(default)]
    pub model: PoolingModel,
    pub studies: Vec<StudyRecord>,
    #[serde(default)]
    pub alpha: Option<f64>,
    #[serde(default)]
    pub hartung_knapp: Option<bool>,
    /// Also re-pool with each study left out
    #[serde(default)]
    pub leave_one_out: bool,
    /// Categorical covariate to split subgroups on
    #[serde(default)]
    pub subgroup_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeterogeneityRequest {
    pub measure: EffectMeasure,
    pub studies: Vec<StudyRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BiasRequest {
    pub measure: EffectMeasure,
    #[serde(default)]
    pub model: PoolingModel,
    pub studies: Vec<StudyRecord>,
    #[serde(default)]
    pub alpha: Option<f64>,
    #[serde(default)]
    pub trim_and_fill: bool,
}

/// A network study given either arm by arm or as a labelled two-arm record
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NetworkStudyInput {
    Arms(NetworkStudy),
    Record(StudyRecord),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkRequest {
    pub measure: EffectMeasure,
    #[serde(default)]
    pub model: PoolingModel,
    #[serde(default)]
    pub direction: OutcomeDirection,
    pub studies: Vec<NetworkStudyInput>,
    #[serde(default)]
    pub alpha: Option<f64>,
    #[serde(default)]
    pub simulations: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl NetworkRequest {
    pub(crate) fn options(&self) -> NetworkOptions {
        NetworkOptions::new(self.measure)
            .model(self.model)
            .direction(self.direction)
    }

    pub(crate) fn config(&self, base: &AnalysisConfig) -> Result<AnalysisConfig> {
        let mut config = *base;
        if let Some(simulations) = self.simulations {
            config = config.simulations(simulations);
        }
        if let Some(seed) = self.seed {
            config = config.seed(seed);
        }
        request_config(&config, self.alpha, None)
    }

    pub(crate) fn network_studies(&self) -> Result<Vec<NetworkStudy>> {
        self.studies
            .iter()
            .map(|input| match input {
                NetworkStudyInput::Arms(study) => Ok(study.clone()),
                NetworkStudyInput::Record(record) => NetworkStudy::try_from(record),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForestRequest {
    #[serde(flatten)]
    pub analysis: PoolRequest,
    /// Study ids in display order
    #[serde(default)]
    pub order: Option<Vec<String>>,
}

/// Which plot to build and from what
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "plot_type", rename_all = "snake_case")]
pub enum PlotRequest {
    Forest(ForestRequest),
    Funnel(BiasRequest),
    TrafficLight {
        judgements: RiskJudgements,
        #[serde(default)]
        study_order: Option<Vec<String>>,
        #[serde(default)]
        domain_order: Option<Vec<String>>,
    },
    Prisma {
        counts: PrismaCounts,
    },
    Network(NetworkRequest),
    Ranking(NetworkRequest),
    League(NetworkRequest),
}
