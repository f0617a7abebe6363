use smartlease_core::{
    Config, DatabasePool, Embedder, HttpEmbedder, LLMClient, SearchPipeline, VLLMClient,
};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SearchPipeline>,
    pub pool: DatabasePool,
    pub embedder: Arc<dyn Embedder>,
    pub search_semaphore: Arc<tokio::sync::Semaphore>,
    /// Budget for one search, including time spent waiting for a slot
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        config: &Config,
        pool: DatabasePool,
        chat: Arc<dyn LLMClient>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let pipeline = SearchPipeline::new(config, pool.clone(), chat, embedder.clone());

        Self {
            pipeline: Arc::new(pipeline),
            pool,
            embedder,
            search_semaphore: Arc::new(tokio::sync::Semaphore::new(
                config.server.max_concurrent_requests,
            )),
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        }
    }

    /// Build state against the configured store and inference services
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let db_path = config.database_path();
        let pool = DatabasePool::open(&db_path, config.store.pool_size)?;
        tracing::info!("Property store: {}", db_path.display());

        let client: Arc<dyn LLMClient> = Arc::new(VLLMClient::new(config.llm_service.clone())?);
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(client.clone()));

        Ok(Self::new(config, pool, client, embedder))
    }
}
