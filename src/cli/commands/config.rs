use anyhow::{Context, Result};
use clap::Subcommand;
use std::process::Command;

use crate::cli::output::{Formatter, get_formatter};
use crate::models::{Config, OutputFormat};

const MASK: &str = "********";

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a config file with default values")]
    Init {
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show the effective configuration (file + environment)")]
    Show,
    #[command(about = "Show configuration and data paths")]
    Path,
    #[command(about = "Edit configuration file")]
    Edit,
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat, _verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        ConfigCommand::Init { force } => handle_init(force, formatter.as_ref()),
        ConfigCommand::Show => handle_show(format),
        ConfigCommand::Path => handle_path(),
        ConfigCommand::Edit => handle_edit(formatter.as_ref()),
    }
}

fn handle_init(force: bool, formatter: &dyn Formatter) -> Result<()> {
    let config_path =
        Config::config_path().context("could not determine config directory")?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    let path = Config::default()
        .save()
        .context("failed to write config")?;
    print!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );
    Ok(())
}

/// Copy of the config with secrets replaced, safe to print.
fn masked(config: &Config) -> Config {
    let mut shown = config.clone();
    if shown.vector_store.api_key.is_some() {
        shown.vector_store.api_key = Some(MASK.to_string());
    }
    if shown.playlist.client_secret.is_some() {
        shown.playlist.client_secret = Some(MASK.to_string());
    }
    shown
}

fn handle_show(format: OutputFormat) -> Result<()> {
    let config = masked(&Config::load()?);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Some(path) = Config::config_path().filter(|p| p.exists()) {
        println!("# Config file: {}", path.display());
    } else {
        println!("# No config file; showing defaults with environment overrides");
    }
    println!("# socket_path = \"{}\"", config.socket_path().display());
    println!();
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn handle_path() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let show = |label: &str, path: Option<std::path::PathBuf>| match path {
        Some(p) => {
            let state = if p.exists() { "exists" } else { "missing" };
            println!("{:<12} {} ({})", label, p.display(), state);
        }
        None => println!("{:<12} (unavailable)", label),
    };

    show("Config:", Config::config_path());
    show("Data:", Config::data_dir());
    show("Model:", config.model_dir());
    show("Credentials:", config.credentials_path());
    show("Socket:", Some(config.socket_path()));
    if let Ok(cwd) = std::env::current_dir() {
        show(".env:", Some(cwd.join(".env")));
    }
    Ok(())
}

fn handle_edit(formatter: &dyn Formatter) -> Result<()> {
    let path = Config::config_path().context("could not determine config directory")?;

    if !path.exists() {
        Config::default()
            .save()
            .context("failed to write config")?;
        print!(
            "{}",
            formatter.format_message(&format!("Created config at: {}", path.display()))
        );
    }

    let editor = std::env::var("EDITOR")
        .unwrap_or_else(|_| std::env::var("VISUAL").unwrap_or_else(|_| "vim".into()));

    Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("failed to open editor: {}", editor))?;

    Ok(())
}
