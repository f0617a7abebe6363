//! SmartLease HTTP server
//!
//! Routes:
//! - `POST /hybrid-search` full search chain, returns the re-ranked list
//! - `POST /properties` add one listing and embed it
//! - `GET /health` store row count

pub mod api;
pub mod models;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use smartlease_core::Config;

pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/hybrid-search", post(api::search::hybrid_search))
        .route("/properties", post(api::properties::add_property))
        .route("/health", get(api::health::health))
        .with_state(state)
}

/// Bind the configured address and serve until the process exits
pub async fn start_server(config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    tracing::info!(
        "LLM service: {} ({}), embeddings: {}",
        config.llm_service.model,
        config.llm_service.url,
        config.llm_service.embedding_model
    );

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    tracing::info!("Server listening on {}", config.server.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
