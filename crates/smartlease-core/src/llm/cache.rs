//! Embedding cache shared by one client
//!
//! Only embeddings are cached: they are deterministic for a given model and
//! text. Chat completions are not (re-ranking runs at a non-zero temperature).

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// How long a vector stays valid
pub(crate) const EMBEDDING_TTL: Duration = Duration::from_secs(3600);

/// Entries kept before expired ones are swept
const MAX_ENTRIES: usize = 10_000;

struct CachedVector {
    vector: Vec<f32>,
    stored_at: Instant,
}

/// Vectors keyed by [`EmbeddingCache::key`], dropped after a fixed lifetime
pub(crate) struct EmbeddingCache {
    vectors: RwLock<HashMap<String, CachedVector>>,
    ttl: Duration,
}

impl EmbeddingCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            vectors: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Key for `text` embedded by `model`; a model switch never reuses vectors
    pub(crate) fn key(model: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        format!("{}:{:x}", model, hasher.finalize())
    }

    pub(crate) fn get(&self, key: &str) -> Option<Vec<f32>> {
        let vectors = self.vectors.read().ok()?;
        let cached = vectors.get(key)?;
        (cached.stored_at.elapsed() < self.ttl).then(|| cached.vector.clone())
    }

    /// Remember a vector. A full cache first drops what has expired, then
    /// everything if that was not enough.
    pub(crate) fn insert(&self, key: String, vector: Vec<f32>) {
        let Ok(mut vectors) = self.vectors.write() else {
            return;
        };

        if vectors.len() >= MAX_ENTRIES {
            let ttl = self.ttl;
            vectors.retain(|_, cached| cached.stored_at.elapsed() < ttl);
            if vectors.len() >= MAX_ENTRIES {
                tracing::debug!("Embedding cache full, clearing {} vectors", vectors.len());
                vectors.clear();
            }
        }

        vectors.insert(
            key,
            CachedVector {
                vector,
                stored_at: Instant::now(),
            },
        );
    }
}
