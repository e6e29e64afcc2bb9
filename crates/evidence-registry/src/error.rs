//! Error types for evidence-registry

use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    #[error(transparent)]
    Engine(#[from] evidence_core::Error),

    #[error("Failed to serialize result: {0}")]
    Output(serde_json::Error),
}

impl RegistryError {
    /// Stable error name; engine errors keep their own kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownOperation(_) => "UnknownOperationError",
            Self::InvalidArguments(_) => "InvalidInputError",
            Self::Engine(e) => e.kind(),
            Self::Output(_) => "ComputationError",
        }
    }

    /// `{ kind, message }`, plus the study and field for engine errors that carry them
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let Self::Engine(
            evidence_core::Error::InvalidInput { context, .. }
            | evidence_core::Error::Degenerate { context, .. },
        ) = self
        {
            body["study_id"] = json!(context.study_id);
            body["field"] = json!(context.field);
        }
        body
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
