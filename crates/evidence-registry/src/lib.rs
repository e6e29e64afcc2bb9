//! Named JSON entry points for the evidence-synthesis engine
//!
//! The [`OperationRegistry`] maps an operation identifier to a pure handler
//! that takes JSON arguments plus an [`AnalysisConfig`] and returns a JSON
//! result. The default registry carries:
//!
//! | Operation | Input |
//! |---|---|
//! | `calculate_effect_size` | `{ measure, studies }` |
//! | `pool_effects` | `{ measure, model?, studies, alpha?, hartung_knapp?, leave_one_out?, subgroup_by? }` |
//! | `assess_heterogeneity` | `{ measure, studies }` |
//! | `detect_publication_bias` | `{ measure, model?, studies, alpha?, trim_and_fill? }` |
//! | `run_network_analysis` | `{ measure, model?, direction?, studies, alpha?, simulations?, seed? }` |
//! | `generate_plot_data` | `{ plot_type, .. }` |
//!
//! Engine errors pass through unchanged and serialize as `{ kind, message }`.
//!
//! # Example
//!
//! ```rust
//! use evidence_core::AnalysisConfig;
//! use evidence_registry::OperationRegistry;
//! use serde_json::json;
//!
//! let registry = OperationRegistry::default();
//! let result = registry
//!     .dispatch(
//!         "pool_effects",
//!         json!({
//!             "measure": "OR",
//!             "studies": [
//!                 {"study_id": "S1", "events_treatment": 10, "total_treatment": 100,
//!                  "events_control": 5, "total_control": 100},
//!                 {"study_id": "S2", "events_treatment": 20, "total_treatment": 100,
//!                  "events_control": 10, "total_control": 100}
//!             ]
//!         }),
//!         &AnalysisConfig::default(),
//!     )
//!     .unwrap();
//! assert!(result["pooled"]["point_estimate"].as_f64().unwrap() > 1.0);
//! ```
//!
//! [`AnalysisConfig`]: evidence_core::AnalysisConfig

pub mod error;
mod operations;
mod registry;
pub mod requests;
mod schema;

pub use error::{RegistryError, Result};
pub use registry::{Handler, OperationDescriptor, OperationRegistry, RegisteredOperation};
