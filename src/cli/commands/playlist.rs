use anyhow::Result;
use clap::Args;

use super::build_tools;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::playlist::Track;
use crate::tools::{PlaylistArgs as ToolPlaylistArgs, TrackList};

#[derive(Debug, Args)]
pub struct PlaylistArgs {
    #[arg(required = true, help = "Mood or vibe to build the playlist from")]
    pub query: String,

    #[arg(long, short = 't', help = "Playlist title (defaults to the query)")]
    pub title: Option<String>,

    #[arg(long, short = 'n', help = "Number of songs to search for (1-50)")]
    pub limit: Option<u32>,

    #[arg(long, short = 'd', help = "Playlist description")]
    pub description: Option<String>,

    #[arg(long, help = "Privacy: private, unlisted or public")]
    pub privacy: Option<String>,
}

pub async fn handle_playlist(args: PlaylistArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);
    let limit = args.limit.unwrap_or(config.search.default_limit);

    let tools = build_tools(&config)?;
    let results = tools
        .search_songs(&args.query, Some(i64::from(limit)))
        .await?;
    if results.is_empty() {
        anyhow::bail!("no songs matched \"{}\"", args.query);
    }
    if verbose {
        eprintln!("Found {} candidate songs", results.len());
    }

    let tracks: Vec<Track> = results
        .results
        .iter()
        .map(|hit| Track::new(&hit.artist, &hit.song))
        .collect();

    let summary = tools
        .create_youtube_playlist(ToolPlaylistArgs {
            title: args.title.unwrap_or_else(|| args.query.clone()),
            songs: TrackList::List(tracks),
            description: args.description,
            privacy: args.privacy,
        })
        .await?;

    print!("{}", formatter.format_playlist(&summary));
    Ok(())
}
