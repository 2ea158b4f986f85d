use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::{connect_store, load_embedder};
use crate::cli::output::get_formatter;
use crate::models::{Config, IdStrategy, OutputFormat};
use crate::services::corpus;
use crate::services::{BatchReport, Ingestor};

#[derive(Debug, Args)]
pub struct IngestArgs {
    #[arg(required = true, help = "Corpus file (JSON array or JSON lines), or - for stdin")]
    pub input: PathBuf,

    #[arg(long, short = 'l', help = "Stop after this many valid songs")]
    pub limit: Option<usize>,

    #[arg(long, short = 'b', help = "Songs per embed/upsert batch")]
    pub batch_size: Option<usize>,

    #[arg(long, help = "Point id strategy: random or content")]
    pub id_strategy: Option<IdStrategy>,
}

pub async fn handle_ingest(args: IngestArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let batch_size = args
        .batch_size
        .unwrap_or(config.ingest.batch_size as usize);
    let id_strategy = args.id_strategy.unwrap_or(config.ingest.id_strategy);

    let reader = corpus::open(&args.input)
        .with_context(|| format!("failed to open corpus {}", args.input.display()))?
        .with_limit(args.limit);

    let embedder = load_embedder(&config)?;
    let store = connect_store(&config)?;
    info!(
        collection = store.collection(),
        batch_size,
        id_strategy = ?id_strategy,
        "starting ingestion"
    );

    let pb = match args.limit {
        Some(limit) => {
            let pb = ProgressBar::new(limit as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} songs",
                    )?
                    .progress_chars("#>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {pos} songs stored {msg}")?,
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        }
    };

    let mut on_batch = |report: &BatchReport| {
        pb.set_position(report.songs_upserted as u64);
        pb.set_message(format!("(batch {})", report.index + 1));
        if verbose {
            pb.println(format!(
                "batch {}: {} songs",
                report.index + 1,
                report.size
            ));
        }
    };

    let result = Ingestor::new(&embedder, store.as_ref())
        .with_batch_size(batch_size)
        .with_id_strategy(id_strategy)
        .ingest_corpus(reader, &mut on_batch)
        .await;
    pb.finish_and_clear();

    let stats = result.context("ingestion aborted; batches stored before the failure remain")?;

    print!("{}", formatter.format_ingest_stats(&stats));
    Ok(())
}
