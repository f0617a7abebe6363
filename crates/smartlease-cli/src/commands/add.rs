//! Add command

use super::{inference_clients, open_pool};
use crate::app::{AddArgs, OutputFormat};
use anyhow::Result;
use smartlease_core::{add_property, Config, PropertyRecord};

pub async fn run(args: AddArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let record = PropertyRecord::from_fields(args.fields)?;
    let pool = open_pool(config)?;
    let (_, embedder) = inference_clients(config)?;

    add_property(&pool, embedder.as_ref(), &record).await?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({"status": "success", "property_id": record.property_id})
        ),
        OutputFormat::Cli => println!("Added property {}", record.property_id),
    }
    Ok(())
}
