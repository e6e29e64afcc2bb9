//! Publication-bias diagnostics for meta-analysis
//!
//! Small-study effects show up as an asymmetric funnel plot. This crate
//! provides:
//!
//! - **Egger's test**: regression of standardized effect on precision
//! - **Begg's test**: Kendall rank correlation of standardized effects and
//!   variances
//! - **Funnel points**: `(estimate, 1/SE)` per study, in input order
//! - **Trim-and-fill**: Duval-Tweedie L0 estimate of missing studies and the
//!   pooled result after imputing them
//!
//! # Example
//!
//! ```rust
//! use evidence_bias::detect_publication_bias;
//! use evidence_core::{AnalysisConfig, EffectEstimate, EffectMeasure};
//!
//! let estimates: Vec<EffectEstimate> = (1..=8)
//!     .map(|i| {
//!         let se = 0.1 * i as f64;
//!         EffectEstimate::new(format!("S{i}"), 0.3 + se, se * se, EffectMeasure::MeanDifference)
//!     })
//!     .collect();
//!
//! let result = detect_publication_bias(&estimates, &AnalysisConfig::default()).unwrap();
//! println!("Egger p = {:?}, asymmetric = {}", result.egger_p_value(), result.is_asymmetric);
//! ```

mod begg;
mod detector;
mod egger;
mod trim_fill;

pub use begg::{begg_test, BeggTest};
pub use detector::{detect_publication_bias, BiasWarning, FunnelPoint, PublicationBiasResult};
pub use egger::{egger_test, EggerTest};
pub use trim_fill::{trim_and_fill, FunnelSide, TrimAndFill};
