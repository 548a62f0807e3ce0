//! Main Entrypoint for the Kai API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Building the command registry and the configured language-model gateway.
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use kai_api::{
    config::{Config, Provider},
    router::create_router,
    state::AppState,
};
use kai_core::{
    gateway::{GeminiGateway, LanguageModelGateway, OpenAiGateway, ScriptedGateway},
    registry::{CommandRegistry, RegistryConfig},
};
use std::{collections::HashMap, fs, net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// A helper function to load prompts from a directory.
fn load_prompts(prompts_path: &std::path::Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    for entry in std::fs::read_dir(prompts_path)
        .with_context(|| format!("Could not read prompts directory {}", prompts_path.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

/// Builds the gateway selected by `config.provider`.
fn build_gateway(
    config: &Config,
    system_prompt: String,
    registry: &CommandRegistry,
) -> anyhow::Result<Arc<dyn LanguageModelGateway>> {
    let gateway: Arc<dyn LanguageModelGateway> = match &config.provider {
        Provider::OpenAI => {
            info!("Using OpenAI provider.");
            let api_key = config
                .openai_api_key
                .as_ref()
                .context("OPENAI_API_KEY is required for the openai provider")?;
            let openai_config = OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(&config.openai_api_base);
            Arc::new(OpenAiGateway::new(
                openai_config,
                config.chat_model.clone(),
                system_prompt,
                registry,
            )?)
        }
        Provider::Gemini => {
            info!("Using Gemini provider.");
            let api_key = config
                .gemini_api_key
                .clone()
                .context("GEMINI_API_KEY is required for the gemini provider")?;
            Arc::new(GeminiGateway::new(
                api_key,
                config.chat_model.clone(),
                system_prompt,
                registry,
            )?
            .with_base_url(&config.gemini_api_base))
        }
        Provider::Mock => {
            info!(
                latency_ms = config.mock_latency.as_millis() as u64,
                "Using scripted offline provider."
            );
            Arc::new(ScriptedGateway::with_latency(config.mock_latency))
        }
    };
    Ok(gateway)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let registry = Arc::new(CommandRegistry::with_default_commands(RegistryConfig {
        default_container_id: config.default_container_id.clone(),
    }));
    info!(commands = registry.tags().count(), "Command registry ready.");

    let system_prompt = match &config.provider {
        Provider::Mock => String::new(),
        _ => load_prompts(&config.prompts_path)?
            .remove("system_prompt")
            .context("system_prompt.md not found in prompts directory")?,
    };
    let gateway = build_gateway(&config, system_prompt, &registry)?;

    let app_state = Arc::new(AppState { gateway, registry });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
