//! Operation registry mapping identifiers to JSON handlers

use crate::error::{RegistryError, Result};
use crate::{operations, schema};
use evidence_core::AnalysisConfig;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// Pure handler: parse arguments, run the engine, serialize the result
pub type Handler = fn(Value, &AnalysisConfig) -> Result<Value>;

/// A named operation with its description and input schema
#[derive(Clone)]
pub struct RegisteredOperation {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub handler: Handler,
}

impl std::fmt::Debug for RegisteredOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredOperation")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Serializable listing entry for an operation
#[derive(Debug, Clone, Serialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Registry of named operations
///
/// [`OperationRegistry::default`] carries the six built-in operations;
/// [`OperationRegistry::new`] starts empty.
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    operations: BTreeMap<String, RegisteredOperation>,
}

impl OperationRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            operations: BTreeMap::new(),
        }
    }

    /// Registry with every built-in operation
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            "calculate_effect_size",
            "Compute a per-study effect estimate and sampling variance for the chosen measure",
            schema::effect_size(),
            operations::calculate_effect_size,
        );
        registry.register(
            "pool_effects",
            "Pool effect estimates under a fixed or random-effects model, with optional \
             leave-one-out and subgroup analyses",
            schema::pool(),
            operations::pool,
        );
        registry.register(
            "assess_heterogeneity",
            "Cochran's Q, I², H and the DerSimonian-Laird tau² for a set of studies",
            schema::heterogeneity(),
            operations::heterogeneity,
        );
        registry.register(
            "detect_publication_bias",
            "Egger regression and Begg rank correlation, with optional trim-and-fill",
            schema::publication_bias(),
            operations::publication_bias,
        );
        registry.register(
            "run_network_analysis",
            "Network meta-analysis: geometry, loop consistency, league estimates and rankings",
            schema::network(),
            operations::network,
        );
        registry.register(
            "generate_plot_data",
            "Plot-ready data for forest, funnel, traffic-light, PRISMA, network, ranking \
             and league displays",
            schema::plot(),
            operations::plot,
        );
        registry
    }

    /// Add an operation, replacing any previous one with the same name
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: Handler,
    ) -> &mut Self {
        let name = name.into();
        if self.operations.contains_key(&name) {
            debug!(operation = %name, "replacing registered operation");
        }
        self.operations.insert(
            name.clone(),
            RegisteredOperation {
                name,
                description: description.into(),
                input_schema,
                handler,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredOperation> {
        self.operations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Operation names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Names, descriptions and schemas of every operation
    pub fn describe(&self) -> Vec<OperationDescriptor> {
        self.operations
            .values()
            .map(|op| OperationDescriptor {
                name: op.name.clone(),
                description: op.description.clone(),
                input_schema: op.input_schema.clone(),
            })
            .collect()
    }

    /// Run the named operation on JSON arguments
    #[instrument(skip(self, args, config))]
    pub fn dispatch(&self, name: &str, args: Value, config: &AnalysisConfig) -> Result<Value> {
        let op = self.get(name).ok_or_else(|| {
            warn!("unknown operation requested");
            RegistryError::UnknownOperation(name.to_string())
        })?;
        debug!("dispatching");
        let result = (op.handler)(args, config);
        if let Err(e) = &result {
            debug!(kind = e.kind(), error = %e, "operation failed");
        }
        result
    }

    /// Like [`dispatch`](Self::dispatch) but folds the outcome into one
    /// envelope: `{"ok": result}` or `{"error": {kind, message, ..}}`
    pub fn invoke(&self, name: &str, args: Value, config: &AnalysisConfig) -> Value {
        match self.dispatch(name, args, config) {
            Ok(value) => json!({ "ok": value }),
            Err(e) => json!({ "error": e.to_json() }),
        }
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
