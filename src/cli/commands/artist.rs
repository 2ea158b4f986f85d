use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use super::connect_store;
use crate::cli::output::get_formatter;
use crate::error::EmbeddingError;
use crate::models::{Config, OutputFormat};
use crate::services::embedding::Embedder;
use crate::tools::SongTools;

#[derive(Debug, Args)]
pub struct ArtistArgs {
    #[arg(required = true, help = "Exact artist name")]
    pub name: String,

    #[arg(long, short = 'n', help = "Maximum number of songs to return (1-50)")]
    pub limit: Option<u32>,
}

/// Artist lookup never embeds, so it runs without the model present.
struct NoEmbedder(usize);

impl Embedder for NoEmbedder {
    fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::NotFound(
            "artist lookup does not load a model".to_string(),
        ))
    }

    fn dimension(&self) -> usize {
        self.0
    }
}

pub async fn handle_artist(args: ArtistArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);
    let limit = args.limit.unwrap_or(config.search.default_limit);

    let store = connect_store(&config)?;
    let tools = SongTools::new(
        Arc::new(NoEmbedder(config.embedding.dimension as usize)),
        Arc::from(store),
    );
    let results = tools
        .search_songs_by_artist(&args.name, Some(i64::from(limit)))
        .await?;

    print!("{}", formatter.format_search_results(&results));
    Ok(())
}
