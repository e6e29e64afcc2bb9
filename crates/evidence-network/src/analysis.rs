//! End-to-end network meta-analysis

use crate::consistency::{check_consistency, ConsistencyResult};
use crate::graph::{NetworkGeometry, NetworkGraph};
use crate::model::{ComparisonEstimate, ComponentModel};
use crate::ranking::{rank_component, RankingResult, RankingSummary};
use crate::types::{NetworkOptions, NetworkStudy, OutcomeDirection};
use evidence_core::{AnalysisConfig, EffectMeasure, PoolingModel, Result, StudyRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument, warn};

/// Conditions worth surfacing that do not stop the analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NetworkWarning {
    /// Treatments in different components are ranked separately
    Disconnected { components: usize },
    /// Contrasts from these studies share an arm but are pooled as independent
    MultiArmCorrelationIgnored { studies: Vec<String> },
    /// These studies had a zero-variance contrast that was left out of the graph
    ZeroVarianceExcluded { studies: Vec<String> },
}

impl fmt::Display for NetworkWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected { components } => write!(
                f,
                "network has {components} disconnected components; rankings are per component"
            ),
            Self::MultiArmCorrelationIgnored { studies } => write!(
                f,
                "multi-arm studies treated as independent contrasts: {}",
                studies.join(", ")
            ),
            Self::ZeroVarianceExcluded { studies } => write!(
                f,
                "zero-variance contrasts carry no weight and were left out: {}",
                studies.join(", ")
            ),
        }
    }
}

/// Everything computed for one network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkAnalysis {
    pub measure: EffectMeasure,
    pub model: PoolingModel,
    pub direction: OutcomeDirection,
    pub graph: NetworkGraph,
    pub geometry: NetworkGeometry,
    /// One entry per triangle; empty when the graph has none
    pub consistency: Vec<ConsistencyResult>,
    /// Every treatment pair within a component, later versus earlier
    pub comparisons: Vec<ComparisonEstimate>,
    /// Rankings grouped by component, treatments in sorted order
    pub rankings: Vec<RankingResult>,
    pub ranking_summary: RankingSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<NetworkWarning>,
}

impl NetworkAnalysis {
    /// Network estimate for a pair, in the stored orientation
    pub fn comparison(&self, a: &str, b: &str) -> Option<&ComparisonEstimate> {
        self.comparisons.iter().find(|c| {
            (c.treatment == a && c.comparator == b) || (c.treatment == b && c.comparator == a)
        })
    }

    pub fn ranking(&self, treatment: &str) -> Option<&RankingResult> {
        self.rankings.iter().find(|r| r.treatment == treatment)
    }

    /// Rankings of one component, best SUCRA first
    pub fn league(&self, component: usize) -> Vec<&RankingResult> {
        let mut league: Vec<&RankingResult> = self
            .rankings
            .iter()
            .filter(|r| r.component == component)
            .collect();
        league.sort_by(|a, b| b.sucra.total_cmp(&a.sucra));
        league
    }
}

/// Build the evidence graph, check loop consistency, estimate every
/// comparison under the consistency model and rank treatments
///
/// A disconnected network is analysed component by component and flagged
/// with [`NetworkWarning::Disconnected`].
#[instrument(skip_all, fields(studies = studies.len(), measure = %options.measure))]
pub fn run_network_analysis(
    studies: &[NetworkStudy],
    options: &NetworkOptions,
    config: &AnalysisConfig,
) -> Result<NetworkAnalysis> {
    config.validate()?;
    let graph = NetworkGraph::build(studies, options, config)?;
    let geometry = graph.geometry(studies);
    let mut warnings = Vec::new();

    if !geometry.connected {
        warn!(
            components = geometry.components.len(),
            "network is disconnected"
        );
        warnings.push(NetworkWarning::Disconnected {
            components: geometry.components.len(),
        });
    }
    let multi_arm: Vec<String> = studies
        .iter()
        .filter(|s| s.is_multi_arm())
        .map(|s| s.study_id.clone())
        .collect();
    if !multi_arm.is_empty() {
        warnings.push(NetworkWarning::MultiArmCorrelationIgnored { studies: multi_arm });
    }
    if !graph.zero_variance_studies.is_empty() {
        warnings.push(NetworkWarning::ZeroVarianceExcluded {
            studies: graph.zero_variance_studies.clone(),
        });
    }

    let consistency = check_consistency(&graph)?;

    let mut comparisons = Vec::new();
    let mut rankings = Vec::new();
    for (component, members) in graph.component_indices().into_iter().enumerate() {
        let model = ComponentModel::fit(&graph, component, members)?;
        comparisons.extend(model.comparisons(&graph, options.measure, config)?);
        rankings.extend(rank_component(
            &model,
            &graph,
            options.direction,
            &config.ranking,
        )?);
    }

    let monte_carlo_tolerance = 3.0
        * rankings
            .iter()
            .map(|r| r.sucra_standard_error)
            .fold(0.0, f64::max);

    debug!(
        treatments = geometry.treatment_count,
        edges = geometry.edge_count,
        loops = consistency.len(),
        "network analysis complete"
    );

    Ok(NetworkAnalysis {
        measure: options.measure,
        model: options.model,
        direction: options.direction,
        graph,
        geometry,
        consistency,
        comparisons,
        rankings,
        ranking_summary: RankingSummary {
            simulations: config.ranking.simulations,
            seed: config.ranking.seed,
            monte_carlo_tolerance,
        },
        warnings,
    })
}

/// Run the analysis on labelled two-arm study records
pub fn run_network_analysis_on_records(
    records: &[StudyRecord],
    options: &NetworkOptions,
    config: &AnalysisConfig,
) -> Result<NetworkAnalysis> {
    let studies = records
        .iter()
        .map(NetworkStudy::try_from)
        .collect::<Result<Vec<_>>>()?;
    run_network_analysis(&studies, options, config)
}
