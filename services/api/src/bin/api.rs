//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FileStore, GeminiClient, GeminiContentAdapter, GeminiImageAdapter, OpenAiContentAdapter},
    config::{Config, GenerationProvider, StorageBackend},
    error::ApiError,
    web::{build_router, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method};
use axum::Router;
use lesson_core::controller::Controller;
use lesson_core::memory_store::MemoryStore;
use lesson_core::ports::{ContentGenerationService, KeyValueStore};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open Storage ---
    let store: Arc<dyn KeyValueStore> = match config.storage_backend {
        StorageBackend::File => Arc::new(FileStore::open(&config.storage_path, config.storage_quota_bytes)?),
        StorageBackend::Memory => {
            warn!("Using in-memory storage; users and history are lost on restart");
            Arc::new(MemoryStore::with_quota(config.storage_quota_bytes))
        }
    };

    // --- 3. Initialize Service Adapters ---
    let gemini_key = config
        .gemini_api_key
        .as_deref()
        .ok_or_else(|| ApiError::Internal("GEMINI_API_KEY is required".to_string()))?;
    let gemini_client = GeminiClient::new(gemini_key, &config.gemini_base_url)?;

    let content_adapter: Arc<dyn ContentGenerationService> = match config.generation_provider {
        GenerationProvider::Gemini => Arc::new(GeminiContentAdapter::new(
            gemini_client.clone(),
            config.text_model.clone(),
        )),
        GenerationProvider::OpenAi => {
            let api_key = config
                .openai_api_key
                .as_deref()
                .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
            let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
            if let Some(base) = &config.openai_base_url {
                openai_config = openai_config.with_api_base(base);
            }
            Arc::new(OpenAiContentAdapter::new(
                Client::with_config(openai_config),
                config.openai_model.clone(),
            ))
        }
    };
    let image_adapter = Arc::new(GeminiImageAdapter::new(gemini_client, config.image_model.clone()));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        controller: Arc::new(Mutex::new(Controller::new(store))),
        config: config.clone(),
        content_adapter,
        image_adapter,
    });
    app_state.spawn_initialization();

    // --- 5. Create the Web Router ---
    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(build_router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
