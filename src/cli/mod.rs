//! CLI module for vibecurator.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Music curation over a semantic song index, with tools for LLM agents.
#[derive(Debug, Parser)]
#[command(name = "vibecurator")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check model, vector store and tool server status
    Status,

    /// Embed a song corpus and store it in the vector store
    Ingest(commands::IngestArgs),

    /// Find songs matching a mood, vibe or description
    Search(commands::SearchArgs),

    /// List songs by an exact artist name
    Artist(commands::ArtistArgs),

    /// Search for songs and turn them into a YouTube playlist
    Playlist(commands::PlaylistArgs),

    /// Inspect or invoke the agent tools
    #[command(subcommand)]
    Tool(commands::ToolCommand),

    /// Run the tool server on a Unix socket
    Serve(commands::ServeArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
