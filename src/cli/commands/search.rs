use anyhow::Result;
use clap::Args;
use tracing::debug;

use super::build_tools;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Mood, vibe or description, e.g. \"rainy day melancholy\"")]
    pub query: String,

    #[arg(long, short = 'n', help = "Maximum number of songs to return (1-50)")]
    pub limit: Option<u32>,
}

pub async fn handle_search(args: SearchArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        anyhow::bail!("search query cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);
    let limit = args.limit.unwrap_or(config.search.default_limit);

    debug!(query, limit, "semantic search");
    let tools = build_tools(&config)?;
    let results = tools.search_songs(query, Some(i64::from(limit))).await?;

    if verbose {
        eprintln!("Search took {}ms", results.duration_ms);
    }

    print!("{}", formatter.format_search_results(&results));
    Ok(())
}
