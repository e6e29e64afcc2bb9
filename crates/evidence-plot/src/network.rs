//! Plot data derived from a network meta-analysis

use evidence_core::math::distributions::z_critical;
use evidence_core::{EffectMeasure, Result};
use evidence_network::{EvidenceKind, NetworkAnalysis, RankingResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub treatment: String,
    pub component: usize,
    /// Distinct studies with an arm on this treatment
    pub study_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sucra: Option<f64>,
}

/// Edge of the network graph; width usually scales with `study_count`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkPlotEdge {
    pub from: String,
    pub to: String,
    pub study_count: usize,
    /// Direct pooled effect of `to` versus `from`, reporting scale
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkPlotData {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkPlotEdge>,
    pub connected: bool,
}

/// Nodes and edges of the evidence network
pub fn network_plot(analysis: &NetworkAnalysis) -> NetworkPlotData {
    let component_of = |treatment: &str| {
        analysis
            .geometry
            .components
            .iter()
            .position(|members| members.iter().any(|m| m == treatment))
            .unwrap_or(0)
    };

    let nodes = analysis
        .graph
        .treatments
        .iter()
        .map(|treatment| {
            let studies: BTreeSet<&str> = analysis
                .graph
                .edges
                .iter()
                .filter(|e| &e.from == treatment || &e.to == treatment)
                .flat_map(|e| e.studies.iter().map(String::as_str))
                .collect();
            NetworkNode {
                treatment: treatment.clone(),
                component: component_of(treatment),
                study_count: studies.len(),
                sucra: analysis.ranking(treatment).map(|r| r.sucra),
            }
        })
        .collect();

    let edges = analysis
        .graph
        .edges
        .iter()
        .map(|edge| NetworkPlotEdge {
            from: edge.from.clone(),
            to: edge.to.clone(),
            study_count: edge.study_count,
            estimate: edge.pooled.point_estimate,
            lower: edge.pooled.confidence_interval.lower,
            upper: edge.pooled.confidence_interval.upper,
        })
        .collect();

    NetworkPlotData {
        nodes,
        edges,
        connected: analysis.geometry.connected,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingSeries {
    pub treatment: String,
    pub component: usize,
    pub sucra: f64,
    pub p_score: f64,
    pub mean_rank: f64,
    /// Probability of each rank, best first
    pub rank_probabilities: Vec<f64>,
    /// Cumulative ranking curve; its normalized area is the SUCRA
    pub cumulative: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingChartData {
    /// Sorted by component, then by SUCRA descending
    pub series: Vec<RankingSeries>,
    pub simulations: usize,
    pub seed: u64,
    pub monte_carlo_tolerance: f64,
}

fn series(ranking: &RankingResult) -> RankingSeries {
    let cumulative = ranking
        .rank_distribution
        .iter()
        .scan(0.0, |total, p| {
            *total += p;
            Some(*total)
        })
        .collect();
    RankingSeries {
        treatment: ranking.treatment.clone(),
        component: ranking.component,
        sucra: ranking.sucra,
        p_score: ranking.p_score,
        mean_rank: ranking.mean_rank,
        rank_probabilities: ranking.rank_distribution.clone(),
        cumulative,
    }
}

/// Rankograms and cumulative ranking curves
pub fn ranking_chart(analysis: &NetworkAnalysis) -> RankingChartData {
    let mut series: Vec<RankingSeries> = analysis.rankings.iter().map(series).collect();
    series.sort_by(|a, b| {
        a.component
            .cmp(&b.component)
            .then_with(|| b.sucra.total_cmp(&a.sucra))
    });
    RankingChartData {
        series,
        simulations: analysis.ranking_summary.simulations,
        seed: analysis.ranking_summary.seed,
        monte_carlo_tolerance: analysis.ranking_summary.monte_carlo_tolerance,
    }
}

/// Effect of the row treatment versus the column treatment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueCell {
    pub row: String,
    pub column: String,
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
    pub evidence: EvidenceKind,
}

/// Square table of network estimates for one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueTable {
    pub component: usize,
    pub measure: EffectMeasure,
    /// Row and column order, best SUCRA first
    pub treatments: Vec<String>,
    /// Off-diagonal cells, row-major
    pub cells: Vec<LeagueCell>,
}

/// League tables, one per component
pub fn league_table(analysis: &NetworkAnalysis) -> Result<Vec<LeagueTable>> {
    let measure = analysis.measure;
    let mut tables = Vec::new();

    for component in 0..analysis.geometry.components.len() {
        let treatments: Vec<String> = analysis
            .league(component)
            .into_iter()
            .map(|r| r.treatment.clone())
            .collect();
        let mut cells = Vec::new();

        for row in &treatments {
            for column in treatments.iter().filter(|c| *c != row) {
                let Some(comparison) = analysis.comparison(row, column) else {
                    continue;
                };
                // Stored as treatment versus comparator; flip when the row is the comparator
                let sign = if &comparison.treatment == row { 1.0 } else { -1.0 };
                let z = z_critical(1.0 - comparison.confidence_interval.level)?;
                let estimate = sign * comparison.estimate;
                let margin = z * comparison.variance.sqrt();
                cells.push(LeagueCell {
                    row: row.clone(),
                    column: column.clone(),
                    estimate: measure.to_reporting_scale(estimate),
                    lower: measure.to_reporting_scale(estimate - margin),
                    upper: measure.to_reporting_scale(estimate + margin),
                    evidence: comparison.evidence,
                });
            }
        }

        tables.push(LeagueTable {
            component,
            measure,
            treatments,
            cells,
        });
    }
    Ok(tables)
}
