//! Axum Handlers for the REST API
//!
//! This module contains the logic for the service's plain HTTP endpoints.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use crate::{
    models::{ErrorResponse, HealthResponse, InstructionSetEntry},
    state::AppState,
};

pub enum ApiError {
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
        }
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// List every command the language model may emit.
#[utoipa::path(
    get,
    path = "/instruction-set",
    responses(
        (status = 200, description = "Registered UI commands", body = [InstructionSetEntry])
    )
)]
pub async fn get_instruction_set(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<InstructionSetEntry>> {
    let entries = state
        .registry
        .function_declarations()
        .into_iter()
        .map(InstructionSetEntry::from)
        .collect();
    Json(entries)
}

/// Look up one command by tag or alias.
#[utoipa::path(
    get,
    path = "/instruction-set/{name}",
    responses(
        (status = 200, description = "Command details", body = InstructionSetEntry),
        (status = 404, description = "No such command", body = ErrorResponse)
    ),
    params(
        ("name" = String, Path, description = "Command tag, e.g. ADD_SLIDER, or alias, e.g. AddSliderCommand")
    )
)]
pub async fn get_instruction(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<InstructionSetEntry>, ApiError> {
    let schema = state
        .registry
        .resolve(&name)
        .ok_or_else(|| ApiError::NotFound(format!("Command '{}' is not registered", name)))?;

    Ok(Json(InstructionSetEntry {
        name: schema.tag.to_string(),
        description: schema.description.to_string(),
        parameters: schema.parameters.clone(),
    }))
}
