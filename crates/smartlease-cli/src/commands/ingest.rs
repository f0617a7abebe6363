//! Ingest command

use super::{inference_clients, open_pool};
use crate::app::{IngestArgs, OutputFormat};
use crate::progress::ProgressReporter;
use anyhow::{Context, Result};
use smartlease_core::ingest::read_properties_csv;
use smartlease_core::{embed_pending, ingest_records, Config};

pub async fn run(args: IngestArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let batch = read_properties_csv(&args.path)
        .with_context(|| format!("Failed to load {}", args.path.display()))?;

    let pool = open_pool(config)?;
    let mut stats = {
        let db = pool.acquire().await?;
        let stats = ingest_records(&db, &batch.records)?;
        if args.force {
            let cleared = db.clear_embeddings()?;
            tracing::info!("Cleared {} embeddings", cleared);
        }
        stats
    };
    stats.skipped = batch.skipped_rows.len();

    if !args.no_embed {
        let (_, embedder) = inference_clients(config)?;
        let reporter = ProgressReporter::new(format == OutputFormat::Cli);
        stats.embedded = embed_pending(
            &pool,
            embedder.as_ref(),
            args.batch_size,
            Some(|done: usize, total: usize| reporter.update(done, total)),
        )
        .await?;
        reporter.finish();
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Cli => {
            println!("Ingested {}:", args.path.display());
            println!("  Inserted:  {}", stats.inserted);
            println!("  Updated:   {}", stats.updated);
            println!("  Unchanged: {}", stats.unchanged);
            if stats.skipped > 0 {
                println!("  Skipped:   {}", stats.skipped);
            }
            if args.no_embed {
                println!("  Embedded:  skipped (--no-embed)");
            } else {
                println!("  Embedded:  {}", stats.embedded);
            }
        }
    }
    Ok(())
}
