//! Core types for evidence synthesis
//!
//! This crate holds the data model shared by every component of the
//! meta-analysis engine:
//!
//! - [`StudyRecord`]: one study's arm-level numeric data
//! - [`EffectEstimate`]: a standardized effect with its sampling variance
//! - [`EffectMeasure`] and [`PoolingModel`]: what to compute and how to combine it
//! - [`AnalysisConfig`]: explicit per-call settings (alpha, corrections, ranking seed)
//! - [`Error`]: the unified error type with study/field context
//!
//! # Example
//!
//! ```rust
//! use evidence_core::{AnalysisConfig, EffectMeasure, StudyRecord};
//!
//! let study = StudyRecord::binary("Smith 2019", 10.0, 100.0, 5.0, 100.0)
//!     .with_treatments("aspirin", "placebo");
//! let config = AnalysisConfig::new().alpha(0.05);
//!
//! assert!(EffectMeasure::OddsRatio.is_log_scale());
//! assert!(config.validate().is_ok());
//! assert_eq!(study.treatment.as_deref(), Some("aspirin"));
//! ```

pub mod config;
pub mod error;
pub mod math;
pub mod types;

// Re-export core types
pub use config::{AnalysisConfig, RankingConfig};
pub use error::{ensure_finite, Error, ErrorContext, Result};
pub use types::{
    ConfidenceInterval, Covariate, EffectEstimate, EffectMeasure, PoolingModel, StudyOutcome,
    StudyRecord,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AnalysisConfig, ConfidenceInterval, EffectEstimate, EffectMeasure, Error, PoolingModel,
        Result, StudyOutcome, StudyRecord,
    };
}
