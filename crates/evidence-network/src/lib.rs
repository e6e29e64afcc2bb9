//! Network meta-analysis
//!
//! Combines direct and indirect evidence across several treatments:
//!
//! - **Evidence graph**: every arm pair of every study becomes a contrast;
//!   contrasts for the same pair are pooled into one edge
//! - **Geometry**: treatment and edge counts, two-arm versus multi-arm
//!   studies, connected components
//! - **Consistency**: direct versus indirect estimates around every triangle
//! - **Consistency model**: weighted least squares over the pooled edges,
//!   giving an estimate for every pair in a component
//! - **Ranking**: analytic P-scores and seeded Monte Carlo SUCRA
//!
//! Enable the `parallel` feature to simulate rankings on `rayon`; results
//! are identical to the sequential run.
//!
//! # Example
//!
//! ```rust
//! use evidence_core::{AnalysisConfig, EffectMeasure};
//! use evidence_network::{run_network_analysis, NetworkOptions, NetworkStudy, TreatmentArm};
//!
//! let studies = vec![
//!     NetworkStudy::new("S1", vec![
//!         TreatmentArm::binary("placebo", 30.0, 100.0),
//!         TreatmentArm::binary("drug A", 18.0, 100.0),
//!     ]),
//!     NetworkStudy::new("S2", vec![
//!         TreatmentArm::binary("drug A", 20.0, 120.0),
//!         TreatmentArm::binary("drug B", 14.0, 120.0),
//!     ]),
//! ];
//!
//! let config = AnalysisConfig::default().simulations(2_000);
//! let options = NetworkOptions::new(EffectMeasure::OddsRatio);
//! let analysis = run_network_analysis(&studies, &options, &config).unwrap();
//! assert!(analysis.geometry.connected);
//! ```

mod analysis;
mod consistency;
mod graph;
mod model;
mod ranking;
mod types;

pub use analysis::{
    run_network_analysis, run_network_analysis_on_records, NetworkAnalysis, NetworkWarning,
};
pub use consistency::{check_consistency, ConsistencyResult};
pub use graph::{NetworkEdge, NetworkGeometry, NetworkGraph};
pub use model::{ComparisonEstimate, EvidenceKind};
pub use ranking::{RankingResult, RankingSummary};
pub use types::{ArmOutcome, NetworkOptions, NetworkStudy, OutcomeDirection, TreatmentArm};
