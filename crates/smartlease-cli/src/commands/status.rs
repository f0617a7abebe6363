//! Status command

use super::open_pool;
use crate::app::OutputFormat;
use anyhow::Result;
use smartlease_core::Config;

pub async fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let pool = open_pool(config)?;
    let stats = pool.acquire().await?.get_stats()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Cli => {
            println!("Database:        {}", config.database_path().display());
            println!("Properties:      {}", stats.total_properties);
            println!();
            println!("Embeddings:");
            println!("  Embedded:      {}", stats.embedded_properties);
            println!("  Pending:       {}", stats.pending_embeddings);
            if !stats.models.is_empty() {
                println!();
                println!("Models:");
                for usage in &stats.models {
                    let dims = usage
                        .dimensions
                        .map(|d| format!("{} dims", d))
                        .unwrap_or_else(|| "unregistered".to_string());
                    println!("  {:<40} {:>6} properties ({})", usage.model, usage.properties, dims);
                }
            }
        }
    }
    Ok(())
}
