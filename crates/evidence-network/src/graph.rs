//! Evidence graph: treatments as nodes, pooled direct comparisons as edges

use crate::types::{ArmOutcome, NetworkOptions, NetworkStudy, TreatmentArm};
use evidence_core::{AnalysisConfig, EffectEstimate, Error, ErrorContext, Result, StudyRecord};
use evidence_effect::EffectSizeCalculator;
use evidence_pooling::{pool_effects, PooledResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::warn;

/// Pooled direct evidence between two treatments
///
/// `pooled` is the effect of `to` relative to `from`, where `from < to`
/// lexicographically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub from: String,
    pub to: String,
    pub pooled: PooledResult,
    pub study_count: usize,
    pub studies: Vec<String>,
}

/// Treatments and the direct comparisons between them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkGraph {
    /// Unique treatments in sorted order
    pub treatments: Vec<String>,
    /// Edges sorted by `(from, to)`
    pub edges: Vec<NetworkEdge>,
    /// Studies with a zero-variance contrast, which carries no edge weight
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zero_variance_studies: Vec<String>,
}

/// Shape of the evidence network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkGeometry {
    pub treatment_count: usize,
    pub edge_count: usize,
    pub two_arm_studies: usize,
    pub multi_arm_studies: usize,
    pub connected: bool,
    /// Connected components, each sorted, ordered by their first treatment
    pub components: Vec<Vec<String>>,
}

impl NetworkGraph {
    /// Pool every arm pair of every study into edges
    ///
    /// Multi-arm studies contribute one contrast per arm pair; the
    /// correlation between contrasts sharing an arm is not modelled.
    /// Contrasts with zero variance are left out and their studies listed
    /// in `zero_variance_studies`; building fails only when no contrast
    /// with positive variance remains.
    pub fn build(
        studies: &[NetworkStudy],
        options: &NetworkOptions,
        config: &AnalysisConfig,
    ) -> Result<Self> {
        if studies.is_empty() {
            return Err(Error::insufficient("network meta-analysis", 1, 0));
        }

        let calculator = EffectSizeCalculator::new(config);
        let mut treatments = BTreeSet::new();
        let mut contrasts: BTreeMap<(String, String), Vec<EffectEstimate>> = BTreeMap::new();
        let mut zero_variance = BTreeSet::new();

        for study in studies {
            let arms = sorted_arms(study)?;
            for (i, first) in arms.iter().enumerate() {
                treatments.insert(first.treatment.clone());
                for second in &arms[i + 1..] {
                    let record = contrast_record(&study.study_id, second, first)?;
                    let estimate = calculator.calculate(&record, options.measure)?;
                    if estimate.variance == 0.0 {
                        zero_variance.insert(study.study_id.clone());
                        continue;
                    }
                    contrasts
                        .entry((first.treatment.clone(), second.treatment.clone()))
                        .or_default()
                        .push(estimate);
                }
            }
        }

        if treatments.len() < 2 {
            return Err(Error::insufficient(
                "network meta-analysis (treatments)",
                2,
                treatments.len(),
            ));
        }
        if contrasts.is_empty() {
            let first = zero_variance.iter().next().map_or("", String::as_str);
            return Err(Error::zero_variance(first));
        }
        let zero_variance_studies: Vec<String> = zero_variance.into_iter().collect();
        if !zero_variance_studies.is_empty() {
            warn!(
                studies = ?zero_variance_studies,
                "zero-variance contrasts left out of the network"
            );
        }

        let edges = contrasts
            .into_iter()
            .map(|((from, to), estimates)| {
                let pooled = pool_effects(&estimates, options.model, config)?;
                Ok(NetworkEdge {
                    from,
                    to,
                    pooled,
                    study_count: estimates.len(),
                    studies: estimates.into_iter().map(|e| e.study_id).collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            treatments: treatments.into_iter().collect(),
            edges,
            zero_variance_studies,
        })
    }

    /// Build from labelled two-arm study records
    pub fn from_records(
        records: &[StudyRecord],
        options: &NetworkOptions,
        config: &AnalysisConfig,
    ) -> Result<Self> {
        let studies = records
            .iter()
            .map(NetworkStudy::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::build(&studies, options, config)
    }

    /// Index of a treatment in `treatments`
    pub fn index_of(&self, treatment: &str) -> Option<usize> {
        self.treatments
            .binary_search_by(|t| t.as_str().cmp(treatment))
            .ok()
    }

    /// The edge joining two treatments, in either order
    pub fn edge(&self, a: &str, b: &str) -> Option<&NetworkEdge> {
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }

    /// Direct estimate of `to` versus `from` with its variance, if an edge exists
    pub fn direct_effect(&self, from: &str, to: &str) -> Option<(f64, f64)> {
        let edge = self.edge(from, to)?;
        let sign = if edge.from == from { 1.0 } else { -1.0 };
        Some((sign * edge.pooled.estimate, edge.pooled.variance))
    }

    /// Adjacency lists over treatment indices
    pub(crate) fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.treatments.len()];
        for edge in &self.edges {
            if let (Some(a), Some(b)) = (self.index_of(&edge.from), self.index_of(&edge.to)) {
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
        }
        adjacency
    }

    /// Connected components by breadth-first search, as treatment indices
    pub(crate) fn component_indices(&self) -> Vec<Vec<usize>> {
        let adjacency = self.adjacency();
        let mut visited = vec![false; self.treatments.len()];
        let mut components = Vec::new();

        for start in 0..self.treatments.len() {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut queue = VecDeque::from([start]);
            let mut members = Vec::new();
            while let Some(node) = queue.pop_front() {
                members.push(node);
                for &next in &adjacency[node] {
                    if !visited[next] {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }
            members.sort_unstable();
            components.push(members);
        }
        components
    }

    /// Counts and connectivity of the network
    pub fn geometry(&self, studies: &[NetworkStudy]) -> NetworkGeometry {
        let components: Vec<Vec<String>> = self
            .component_indices()
            .into_iter()
            .map(|members| {
                members
                    .into_iter()
                    .map(|i| self.treatments[i].clone())
                    .collect()
            })
            .collect();
        let multi_arm_studies = studies.iter().filter(|s| s.is_multi_arm()).count();

        NetworkGeometry {
            treatment_count: self.treatments.len(),
            edge_count: self.edges.len(),
            two_arm_studies: studies.len() - multi_arm_studies,
            multi_arm_studies,
            connected: components.len() == 1,
            components,
        }
    }
}

/// Arms sorted by treatment label, rejecting fewer than two arms or repeats
fn sorted_arms(study: &NetworkStudy) -> Result<Vec<&TreatmentArm>> {
    if study.arms.len() < 2 {
        return Err(Error::InvalidInput {
            context: ErrorContext::study(&study.study_id).with_field("arms"),
            message: format!("a study needs at least two arms, got {}", study.arms.len()),
        });
    }
    if study.arms.iter().any(|arm| arm.treatment.trim().is_empty()) {
        return Err(Error::InvalidInput {
            context: ErrorContext::study(&study.study_id).with_field("treatment"),
            message: "treatment label must not be empty".to_string(),
        });
    }
    let mut arms: Vec<&TreatmentArm> = study.arms.iter().collect();
    arms.sort_by(|a, b| a.treatment.cmp(&b.treatment));
    for pair in arms.windows(2) {
        if pair[0].treatment == pair[1].treatment {
            return Err(Error::InvalidInput {
                context: ErrorContext::study(&study.study_id).with_field("treatment"),
                message: format!("treatment '{}' appears in more than one arm", pair[0].treatment),
            });
        }
    }
    Ok(arms)
}

/// Two-arm record for `treatment` versus `control`
fn contrast_record(
    study_id: &str,
    treatment: &TreatmentArm,
    control: &TreatmentArm,
) -> Result<StudyRecord> {
    let record = match (&treatment.outcome, &control.outcome) {
        (
            ArmOutcome::Binary { events: et, total: nt },
            ArmOutcome::Binary { events: ec, total: nc },
        ) => StudyRecord::binary(study_id, *et, *nt, *ec, *nc),
        (
            ArmOutcome::Continuous { mean: mt, sd: st, n: nt },
            ArmOutcome::Continuous { mean: mc, sd: sc, n: nc },
        ) => StudyRecord::continuous(study_id, *mt, *st, *nt, *mc, *sc, *nc),
        _ => {
            return Err(Error::InvalidInput {
                context: ErrorContext::study(study_id).with_field("arms"),
                message: "arms mix binary and continuous outcomes".to_string(),
            })
        }
    };
    Ok(record.with_treatments(treatment.treatment.clone(), control.treatment.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use evidence_core::EffectMeasure;

    fn md_study(id: &str, arms: &[(&str, f64)]) -> NetworkStudy {
        NetworkStudy::new(
            id,
            arms.iter()
                .map(|(t, mean)| TreatmentArm::continuous(*t, *mean, 1.0, 50.0))
                .collect(),
        )
    }

    fn options() -> NetworkOptions {
        NetworkOptions::new(EffectMeasure::MeanDifference)
    }

    #[test]
    fn test_contrast_orientation_follows_label_order() {
        // Arms listed out of order; edge is still A -> B with effect B - A
        let studies = vec![md_study("S1", &[("B", 3.0), ("A", 1.0)])];
        let graph = NetworkGraph::build(&studies, &options(), &AnalysisConfig::default()).unwrap();
        assert_eq!(graph.treatments, vec!["A", "B"]);
        assert_eq!(graph.edges[0].from, "A");
        assert_abs_diff_eq!(graph.edges[0].pooled.estimate, 2.0, epsilon = 1e-12);
        assert_eq!(graph.direct_effect("B", "A").unwrap().0, -2.0);
    }

    #[test]
    fn test_multi_arm_study_yields_every_pair() {
        let studies = vec![
            md_study("S1", &[("A", 0.0), ("B", 1.0), ("C", 2.0)]),
            md_study("S2", &[("A", 0.0), ("B", 1.0)]),
        ];
        let graph = NetworkGraph::build(&studies, &options(), &AnalysisConfig::default()).unwrap();
        assert_eq!(graph.edges.len(), 3);
        assert_eq!(graph.edge("B", "A").unwrap().study_count, 2);

        let geometry = graph.geometry(&studies);
        assert_eq!(geometry.multi_arm_studies, 1);
        assert_eq!(geometry.two_arm_studies, 1);
        assert!(geometry.connected);
    }

    #[test]
    fn test_disconnected_components() {
        let studies = vec![
            md_study("S1", &[("A", 0.0), ("B", 1.0)]),
            md_study("S2", &[("C", 0.0), ("D", 1.0)]),
        ];
        let graph = NetworkGraph::build(&studies, &options(), &AnalysisConfig::default()).unwrap();
        let geometry = graph.geometry(&studies);
        assert!(!geometry.connected);
        assert_eq!(geometry.components, vec![vec!["A", "B"], vec!["C", "D"]]);
    }

    fn rd_study(id: &str, first: (&str, f64), second: (&str, f64)) -> NetworkStudy {
        NetworkStudy::new(
            id,
            vec![
                TreatmentArm::binary(first.0, first.1, 50.0),
                TreatmentArm::binary(second.0, second.1, 50.0),
            ],
        )
    }

    #[test]
    fn test_zero_variance_contrast_dropped() {
        let studies = vec![
            rd_study("S1", ("A", 10.0), ("B", 20.0)),
            rd_study("S2", ("A", 0.0), ("C", 0.0)),
            rd_study("S3", ("B", 15.0), ("C", 25.0)),
        ];
        let options = NetworkOptions::new(EffectMeasure::RiskDifference);
        let graph = NetworkGraph::build(&studies, &options, &AnalysisConfig::default()).unwrap();
        assert_eq!(graph.zero_variance_studies, vec!["S2"]);
        assert_eq!(graph.edges.len(), 2);
        assert!(graph.edge("A", "C").is_none());
        assert!(graph.geometry(&studies).connected);
    }

    #[test]
    fn test_only_zero_variance_contrasts_fail() {
        let studies = vec![rd_study("S1", ("A", 0.0), ("B", 0.0))];
        let options = NetworkOptions::new(EffectMeasure::RiskDifference);
        let err = NetworkGraph::build(&studies, &options, &AnalysisConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "DegenerateResultError");
    }

    #[test]
    fn test_repeated_treatment_rejected() {
        let studies = vec![md_study("S1", &[("A", 0.0), ("A", 1.0)])];
        let err =
            NetworkGraph::build(&studies, &options(), &AnalysisConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "InvalidInputError");
    }

    #[test]
    fn test_single_arm_rejected() {
        let studies = vec![md_study("S1", &[("A", 0.0)])];
        let err =
            NetworkGraph::build(&studies, &options(), &AnalysisConfig::default()).unwrap_err();
        assert!(err.to_string().contains("at least two arms"));
    }
}
