//! Pooling and heterogeneity for meta-analysis
//!
//! This crate combines per-study [`EffectEstimate`]s into summary estimates:
//!
//! - **Heterogeneity**: Cochran's Q, I², H and the DerSimonian-Laird τ²
//! - **Fixed-effect pooling**: inverse-variance weights `1/vᵢ`
//! - **Random-effects pooling**: weights `1/(vᵢ + τ²)`, optionally with the
//!   Hartung-Knapp adjustment and a prediction interval
//! - **Sensitivity**: leave-one-out re-pooling
//! - **Subgroups**: per-subgroup pooling with a between-subgroup Q test
//!
//! # Example
//!
//! ```rust
//! use evidence_core::{AnalysisConfig, EffectEstimate, EffectMeasure, PoolingModel};
//! use evidence_pooling::{assess_heterogeneity, pool_effects};
//!
//! let estimates = vec![
//!     EffectEstimate::new("A", 0.30, 0.04, EffectMeasure::MeanDifference),
//!     EffectEstimate::new("B", 0.10, 0.02, EffectMeasure::MeanDifference),
//!     EffectEstimate::new("C", 0.45, 0.05, EffectMeasure::MeanDifference),
//! ];
//!
//! let stats = assess_heterogeneity(&estimates).unwrap();
//! let pooled = pool_effects(&estimates, PoolingModel::Random, &AnalysisConfig::default()).unwrap();
//! println!("{stats}");
//! println!("{pooled}");
//! ```
//!
//! [`EffectEstimate`]: evidence_core::EffectEstimate

mod heterogeneity;
mod pooling;
mod sensitivity;
mod subgroup;
mod validate;

pub use heterogeneity::{assess_heterogeneity, HeterogeneityStats};
pub use pooling::{pool_effects, PooledResult, StudyWeight};
pub use sensitivity::{leave_one_out, LeaveOneOut};
pub use subgroup::{subgroup_analysis, subgroups_from_covariate, SubgroupAnalysis, SubgroupResult};
pub use validate::{check_estimates, split_zero_variance, WeightableSet};
