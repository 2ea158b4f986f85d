use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use super::build_tools;
use crate::client::ToolClient;
use crate::error::ServerError;
use crate::models::Config;
use crate::server::{ToolServer, run_server};
use crate::services::corpus;
use crate::services::{BatchReport, Ingestor};

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[command(subcommand)]
    pub command: Option<ServeCommand>,

    #[arg(long, help = "Detach and run the server in the background")]
    pub background: bool,

    #[arg(long, help = "Ingest this corpus before serving (useful with the memory driver)")]
    pub preload: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum ServeCommand {
    Stop,
}

pub async fn handle_serve(args: ServeArgs) -> Result<()> {
    let config = Config::load()?;

    match args.command {
        Some(ServeCommand::Stop) => handle_stop(&config).await,
        None if args.background => handle_start(&config, args.preload),
        None => run_foreground(config, args.preload).await,
    }
}

fn handle_start(config: &Config, preload: Option<PathBuf>) -> Result<()> {
    let client = ToolClient::from_config(config);

    if client.is_running() {
        println!("Tool server is already running");
        return Ok(());
    }

    let exe = std::env::current_exe()?;
    let mut command = std::process::Command::new(&exe);
    command.arg("serve");
    if let Some(path) = preload {
        command.arg("--preload").arg(path);
    }
    command
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()?;

    println!("Tool server started");
    println!("Socket: {}", config.socket_path().display());
    Ok(())
}

async fn handle_stop(config: &Config) -> Result<()> {
    match ToolClient::from_config(config).shutdown().await {
        Ok(()) => {
            println!("Tool server stopped");
            Ok(())
        }
        Err(ServerError::NotRunning) => {
            println!("Tool server is not running");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_foreground(config: Config, preload: Option<PathBuf>) -> Result<()> {
    let tools = build_tools(&config)?;

    if let Some(path) = preload {
        let reader = corpus::open(&path)
            .with_context(|| format!("failed to open corpus {}", path.display()))?;
        let stats = Ingestor::new(tools.embedder(), tools.store())
            .with_batch_size(config.ingest.batch_size as usize)
            .with_id_strategy(config.ingest.id_strategy)
            .ingest_corpus(reader, &mut |_: &BatchReport| {})
            .await?;
        info!(
            songs = stats.songs_upserted,
            skipped = stats.records_skipped,
            "corpus preloaded"
        );
    }

    let server = Arc::new(ToolServer::new(
        tools,
        config.socket_path(),
        config.embedding.model_id.clone(),
        Duration::from_secs(config.server.idle_timeout_secs),
    ));
    run_server(server).await?;
    Ok(())
}
