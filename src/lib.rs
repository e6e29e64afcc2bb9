//! Meta-analysis engine for systematic reviews
//!
//! This crate re-exports the workspace crates under one roof:
//!
//! | Module | Crate | Purpose |
//! |---|---|---|
//! | [`core`] | `evidence-core` | Study records, configuration, errors, distributions |
//! | [`effect`] | `evidence-effect` | Per-study effect sizes (OR, RR, RD, SMD, MD) |
//! | [`pooling`] | `evidence-pooling` | Heterogeneity, fixed and random-effects pooling |
//! | [`bias`] | `evidence-bias` | Egger, Begg and trim-and-fill |
//! | [`network`] | `evidence-network` | Network meta-analysis and treatment rankings |
//! | [`plot`] | `evidence-plot` | Plot-ready data records |
//! | [`registry`] | `evidence-registry` | Named JSON entry points |
//!
//! # Example
//!
//! ```rust
//! use evidence_synth::prelude::*;
//!
//! let studies = vec![
//!     StudyRecord::binary("S1", 10.0, 100.0, 5.0, 100.0),
//!     StudyRecord::binary("S2", 20.0, 100.0, 10.0, 100.0),
//!     StudyRecord::binary("S3", 12.0, 80.0, 9.0, 85.0),
//! ];
//! let config = AnalysisConfig::default();
//!
//! let estimates = calculate_effect_sizes(&studies, EffectMeasure::OddsRatio, &config).unwrap();
//! let pooled = pool_effects(&estimates, PoolingModel::Random, &config).unwrap();
//! let bias = detect_publication_bias(&estimates, &config).unwrap();
//!
//! assert!(pooled.point_estimate > 1.0);
//! assert_eq!(bias.funnel_points.len(), 3);
//! ```

pub use evidence_bias as bias;
pub use evidence_core as core;
pub use evidence_effect as effect;
pub use evidence_network as network;
pub use evidence_plot as plot;
pub use evidence_pooling as pooling;
pub use evidence_registry as registry;

/// Common imports for end-to-end analyses
pub mod prelude {
    pub use evidence_core::prelude::*;
    pub use evidence_core::RankingConfig;

    pub use evidence_effect::{calculate_effect_size, calculate_effect_sizes, EffectSizeCalculator};

    pub use evidence_pooling::{
        assess_heterogeneity, leave_one_out, pool_effects, subgroup_analysis, HeterogeneityStats,
        PooledResult,
    };

    pub use evidence_bias::{detect_publication_bias, trim_and_fill, PublicationBiasResult};

    pub use evidence_network::{
        run_network_analysis, NetworkAnalysis, NetworkOptions, NetworkStudy, OutcomeDirection,
        TreatmentArm,
    };

    pub use evidence_plot::PlotData;

    pub use evidence_registry::{OperationRegistry, RegistryError};
}
