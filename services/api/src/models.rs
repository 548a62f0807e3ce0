//! HTTP API Models
//!
//! Response bodies served by the REST endpoints, annotated for `utoipa`.

use kai_core::registry::FunctionDeclaration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// One command of the UI instruction set, as offered to the language model.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct InstructionSetEntry {
    #[schema(example = "ADD_SLIDER")]
    pub name: String,
    pub description: String,
    /// JSON schema of the command's fields.
    #[schema(value_type = Object)]
    pub parameters: Value,
}

impl From<FunctionDeclaration> for InstructionSetEntry {
    fn from(declaration: FunctionDeclaration) -> Self {
        Self {
            name: declaration.name,
            description: declaration.description,
            parameters: declaration.parameters,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
