//! Standardized effect sizes for meta-analysis
//!
//! Converts raw study data into an [`EffectEstimate`] with its sampling
//! variance, ready for inverse-variance pooling.
//!
//! # Supported Effect Sizes
//!
//! ## Binary outcomes (2x2 counts):
//! - **Odds ratio** and **risk ratio**, represented on the log scale. A 0.5
//!   continuity correction is added to all four cells when any cell is zero.
//! - **Risk difference**, on the natural scale.
//!
//! ## Continuous outcomes (mean, SD, n per arm):
//! - **Mean difference**
//! - **Hedges' g**: bias-corrected standardized mean difference
//!
//! # Example
//!
//! ```rust
//! use evidence_core::{AnalysisConfig, EffectMeasure, StudyRecord};
//! use evidence_effect::calculate_effect_size;
//!
//! let study = StudyRecord::binary("Smith 2019", 10.0, 100.0, 5.0, 100.0);
//! let est = calculate_effect_size(&study, EffectMeasure::OddsRatio, &AnalysisConfig::default())
//!     .unwrap();
//! println!("log OR = {:.3}, var = {:.4}", est.estimate, est.variance);
//! ```

mod binary;
mod calculator;
mod continuous;

// Re-exports
pub use binary::TwoByTwo;
pub use calculator::EffectSizeCalculator;
pub use continuous::{bias_correction_factor, ArmSummaries};

use evidence_core::{AnalysisConfig, EffectEstimate, EffectMeasure, Result, StudyRecord};

/// Compute one study's effect estimate
pub fn calculate_effect_size(
    study: &StudyRecord,
    measure: EffectMeasure,
    config: &AnalysisConfig,
) -> Result<EffectEstimate> {
    EffectSizeCalculator::new(config).calculate(study, measure)
}

/// Compute effect estimates for every study, preserving input order
pub fn calculate_effect_sizes(
    studies: &[StudyRecord],
    measure: EffectMeasure,
    config: &AnalysisConfig,
) -> Result<Vec<EffectEstimate>> {
    EffectSizeCalculator::new(config).calculate_all(studies, measure)
}
