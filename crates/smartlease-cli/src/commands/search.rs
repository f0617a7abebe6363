//! Search command

use super::{inference_clients, open_pool};
use crate::app::{OutputFormat, SearchArgs};
use crate::output;
use anyhow::Result;
use smartlease_core::{Config, SearchOptions, SearchPipeline};

pub async fn run(args: SearchArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let query = args.query.join(" ");
    let pool = open_pool(config)?;
    let (chat, embedder) = inference_clients(config)?;
    let pipeline = SearchPipeline::new(config, pool, chat, embedder);

    let report = pipeline
        .search_with(
            &query,
            SearchOptions {
                rerank: !args.no_rerank,
            },
        )
        .await?;

    output::print_report(&report, format)?;
    Ok(())
}
