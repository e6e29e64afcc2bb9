//! Consistency-model estimates by weighted least squares over pooled edges

use crate::graph::NetworkGraph;
use evidence_core::math::distributions::z_critical;
use evidence_core::{AnalysisConfig, ConfidenceInterval, EffectMeasure, Error, Result};
use nalgebra::{Cholesky, DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a comparison is backed by head-to-head studies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Direct,
    IndirectOnly,
}

impl fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::IndirectOnly => write!(f, "indirect only"),
        }
    }
}

/// Network estimate of one treatment relative to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEstimate {
    /// The later treatment in sort order
    pub treatment: String,
    /// The earlier treatment in sort order
    pub comparator: String,
    /// Index into the geometry's component list
    pub component: usize,
    /// Effect of `treatment` versus `comparator` on the analysis scale
    pub estimate: f64,
    pub variance: f64,
    /// Effect on the reporting scale
    pub point_estimate: f64,
    /// Interval on the reporting scale
    pub confidence_interval: ConfidenceInterval,
    pub evidence: EvidenceKind,
}

/// Fitted consistency model for one connected component
///
/// Basic parameters are the effects of every member relative to the first
/// (reference) member. `effects` and `covariance` are indexed by position in
/// `members`, with the reference fixed at zero.
#[derive(Debug, Clone)]
pub(crate) struct ComponentModel {
    pub component: usize,
    /// Treatment indices into the graph, sorted
    pub members: Vec<usize>,
    pub effects: DVector<f64>,
    pub covariance: DMatrix<f64>,
}

impl ComponentModel {
    /// Solve `(XᵀWX)β = XᵀWy` with one row per edge inside the component
    pub fn fit(graph: &NetworkGraph, component: usize, members: Vec<usize>) -> Result<Self> {
        let m = members.len();
        let p = m.saturating_sub(1);
        let local = |treatment: &str| {
            graph
                .index_of(treatment)
                .and_then(|global| members.iter().position(|&g| g == global))
        };

        let mut xtwx = DMatrix::<f64>::zeros(p, p);
        let mut xtwy = DVector::<f64>::zeros(p);
        for edge in &graph.edges {
            let (Some(from), Some(to)) = (local(&edge.from), local(&edge.to)) else {
                continue;
            };
            let weight = 1.0 / edge.pooled.variance;
            let mut row = DVector::<f64>::zeros(p);
            if to > 0 {
                row[to - 1] = 1.0;
            }
            if from > 0 {
                row[from - 1] = -1.0;
            }
            xtwx += &row * row.transpose() * weight;
            xtwy += &row * (weight * edge.pooled.estimate);
        }

        let mut effects = DVector::<f64>::zeros(m);
        let mut covariance = DMatrix::<f64>::zeros(m, m);
        if p > 0 {
            let chol = Cholesky::new(xtwx).ok_or_else(|| {
                Error::Computation(format!(
                    "consistency model for component {component} is singular"
                ))
            })?;
            let beta = chol.solve(&xtwy);
            let basic_covariance = chol.inverse();
            for r in 0..p {
                effects[r + 1] = beta[r];
                for c in 0..p {
                    covariance[(r + 1, c + 1)] = basic_covariance[(r, c)];
                }
            }
        }

        Ok(Self {
            component,
            members,
            effects,
            covariance,
        })
    }

    /// Effect of member `j` versus member `i` with its variance
    pub fn contrast(&self, i: usize, j: usize) -> (f64, f64) {
        let estimate = self.effects[j] - self.effects[i];
        let variance = self.covariance[(j, j)] + self.covariance[(i, i)]
            - 2.0 * self.covariance[(i, j)];
        (estimate, variance.max(0.0))
    }

    /// Covariance of the basic parameters (members other than the reference)
    pub fn basic_covariance(&self) -> DMatrix<f64> {
        let p = self.members.len() - 1;
        DMatrix::from_fn(p, p, |r, c| self.covariance[(r + 1, c + 1)])
    }

    /// Basic-parameter estimates
    pub fn basic_effects(&self) -> DVector<f64> {
        self.effects.rows(1, self.members.len() - 1).into_owned()
    }

    /// Every pair of members, later versus earlier
    pub fn comparisons(
        &self,
        graph: &NetworkGraph,
        measure: EffectMeasure,
        config: &AnalysisConfig,
    ) -> Result<Vec<ComparisonEstimate>> {
        let z = z_critical(config.alpha)?;
        let level = config.confidence_level();
        let mut comparisons = Vec::new();

        for i in 0..self.members.len() {
            for j in (i + 1)..self.members.len() {
                let comparator = &graph.treatments[self.members[i]];
                let treatment = &graph.treatments[self.members[j]];
                let (estimate, variance) = self.contrast(i, j);
                let evidence = if graph.edge(comparator, treatment).is_some() {
                    EvidenceKind::Direct
                } else {
                    EvidenceKind::IndirectOnly
                };

                comparisons.push(ComparisonEstimate {
                    treatment: treatment.clone(),
                    comparator: comparator.clone(),
                    component: self.component,
                    estimate,
                    variance,
                    point_estimate: measure.to_reporting_scale(estimate),
                    confidence_interval: ConfidenceInterval::symmetric(
                        estimate,
                        z * variance.sqrt(),
                        level,
                    )
                    .map(|x| measure.to_reporting_scale(x)),
                    evidence,
                });
            }
        }
        Ok(comparisons)
    }
}
