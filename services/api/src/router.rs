//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{ErrorResponse, HealthResponse, InstructionSetEntry},
    state::AppState,
    ws::ws_handler,
};

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::get_instruction_set,
        handlers::get_instruction,
    ),
    components(
        schemas(HealthResponse, InstructionSetEntry, ErrorResponse)
    ),
    tags(
        (name = "Kai API", description = "UI instruction set and session transport for the Kai orchestrator")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/instruction-set", get(handlers::get_instruction_set))
        .route("/instruction-set/{name}", get(handlers::get_instruction))
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health))
        .merge(api_router)
        .layer(TraceLayer::new_for_http())
}
