//! CLI command handlers

pub mod add;
pub mod ingest;
pub mod search;
pub mod status;

use smartlease_core::{Config, DatabasePool, Embedder, HttpEmbedder, LLMClient, VLLMClient};
use std::sync::Arc;

/// Open the configured store
pub(crate) fn open_pool(config: &Config) -> anyhow::Result<DatabasePool> {
    let path = config.database_path();
    tracing::debug!("Property store: {}", path.display());
    Ok(DatabasePool::open(&path, config.store.pool_size)?)
}

/// Chat client and embedder sharing one HTTP client
pub(crate) fn inference_clients(
    config: &Config,
) -> anyhow::Result<(Arc<dyn LLMClient>, Arc<dyn Embedder>)> {
    let client: Arc<dyn LLMClient> = Arc::new(VLLMClient::new(config.llm_service.clone())?);
    let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(client.clone()));
    Ok((client, embedder))
}
