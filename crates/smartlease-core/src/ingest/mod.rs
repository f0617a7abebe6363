//! Property ingestion
//!
//! Bulk loads upsert rows and clear the embedding of any row whose summary
//! changed; [`embed_pending`] then fills in every missing vector. Single adds
//! are insert-only and embed immediately.

mod csv;

pub use self::csv::{read_properties, read_properties_csv, CsvBatch};

use crate::db::{Database, DatabasePool, PropertyRecord, UpsertOutcome};
use crate::error::{Result, SmartLeaseError};
use crate::llm::Embedder;
use serde::Serialize;

/// Rows per embedding request
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 32;

/// Counts from one ingestion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub embedded: usize,
}

/// Upsert records into the store
pub fn ingest_records(db: &Database, records: &[PropertyRecord]) -> Result<IngestStats> {
    let mut stats = IngestStats::default();
    for record in records {
        match db.upsert_property(record)? {
            UpsertOutcome::Inserted => stats.inserted += 1,
            UpsertOutcome::Updated => stats.updated += 1,
            UpsertOutcome::Unchanged => stats.unchanged += 1,
        }
    }
    tracing::info!(
        "Upserted {} rows: {} new, {} updated, {} unchanged",
        records.len(),
        stats.inserted,
        stats.updated,
        stats.unchanged
    );
    Ok(stats)
}

/// Embed every property lacking a vector from the embedder's model.
///
/// Works in batches; `progress` is called with `(done, total)` after each.
/// Returns the number of rows embedded.
pub async fn embed_pending<F>(
    pool: &DatabasePool,
    embedder: &dyn Embedder,
    batch_size: usize,
    progress: Option<F>,
) -> Result<usize>
where
    F: Fn(usize, usize) + Send + Sync,
{
    let model = embedder.model_name().to_string();
    let pending = {
        let db = pool.acquire().await?;
        db.properties_needing_embedding(&model)?
    };

    let total = pending.len();
    if total == 0 {
        tracing::debug!("No properties need embedding");
        return Ok(0);
    }

    let batch_size = if batch_size > 0 {
        batch_size
    } else {
        DEFAULT_EMBED_BATCH_SIZE
    };
    tracing::info!("Embedding {} properties with {}", total, model);

    let mut done = 0;
    for chunk in pending.chunks(batch_size) {
        let texts: Vec<String> = chunk.iter().map(|(_, summary)| summary.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunk.len() {
            return Err(SmartLeaseError::ExternalError(format!(
                "Embedder returned {} vectors for {} texts",
                embeddings.len(),
                chunk.len()
            )));
        }

        let db = pool.acquire().await?;
        ensure_dimensions(&db, &model, &embeddings)?;
        for ((property_id, _), embedding) in chunk.iter().zip(&embeddings) {
            db.set_embedding(property_id, &model, embedding)?;
        }
        drop(db);

        done += chunk.len();
        if let Some(ref callback) = progress {
            callback(done, total);
        }
    }

    Ok(done)
}

/// Insert one new property and embed it.
///
/// Fails with [`SmartLeaseError::DuplicateProperty`] if the id is taken.
pub async fn add_property(
    pool: &DatabasePool,
    embedder: &dyn Embedder,
    record: &PropertyRecord,
) -> Result<()> {
    if pool.acquire().await?.property_exists(&record.property_id)? {
        return Err(SmartLeaseError::DuplicateProperty(
            record.property_id.clone(),
        ));
    }

    let embedding = embedder.embed(&record.summary).await?;
    let model = embedder.model_name();

    let db = pool.acquire().await?;
    ensure_dimensions(&db, model, std::slice::from_ref(&embedding))?;
    db.insert_property(record)?;
    db.set_embedding(&record.property_id, model, &embedding)?;

    tracing::info!("Added property {}", record.property_id);
    Ok(())
}

fn ensure_dimensions(db: &Database, model: &str, embeddings: &[Vec<f32>]) -> Result<()> {
    let Some(dims) = embeddings.first().map(Vec::len) else {
        return Ok(());
    };
    if embeddings.iter().any(|e| e.len() != dims) {
        return Err(SmartLeaseError::ExternalError(
            "Embedder returned vectors of mixed dimensions".to_string(),
        ));
    }
    if !db.check_model_compatibility(model, dims)? {
        return Err(SmartLeaseError::Config(format!(
            "Model {} produced {}-dimensional vectors, store holds a different size; \
             re-run ingest with --force to rebuild",
            model, dims
        )));
    }
    db.register_model(model, dims)
}
