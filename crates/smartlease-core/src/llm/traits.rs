//! Seam between the search pipeline and whatever produces vectors

use crate::error::Result;
use async_trait::async_trait;

/// Turns listing and query text into vectors.
///
/// Stored vectors are tagged with [`Embedder::model_name`], so query and
/// listing vectors must come from the same model to be comparable.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// One vector per input, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn model_name(&self) -> &str;
}
