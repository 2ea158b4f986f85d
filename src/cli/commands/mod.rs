mod artist;
mod config;
mod ingest;
mod playlist;
mod search;
mod serve;
mod status;
mod tool;

pub use artist::ArtistArgs;
pub use config::ConfigCommand;
pub use ingest::IngestArgs;
pub use playlist::PlaylistArgs;
pub use search::SearchArgs;
pub use serve::{ServeArgs, ServeCommand};
pub use tool::ToolCommand;

pub use artist::handle_artist;
pub use config::handle_config;
pub use ingest::handle_ingest;
pub use playlist::handle_playlist;
pub use search::handle_search;
pub use serve::handle_serve;
pub use status::handle_status;
pub use tool::handle_tool;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::models::Config;
use crate::services::playlist::{Privacy, YouTubePlaylistClient};
use crate::services::{OnnxEmbedder, VectorStore, create_backend};
use crate::tools::SongTools;

pub(crate) fn load_embedder(config: &Config) -> Result<OnnxEmbedder> {
    let model_dir = config
        .model_dir()
        .context("could not determine models directory")?;
    OnnxEmbedder::load(&config.embedding, &model_dir).with_context(|| {
        format!(
            "failed to load embedding model from {} (set VIBECURATOR_MODEL_DIR or embedding.model_path)",
            model_dir.display()
        )
    })
}

pub(crate) fn connect_store(config: &Config) -> Result<Box<dyn VectorStore>> {
    create_backend(&config.vector_store).context("failed to create vector store client")
}

/// Wire the tools for this process. Playlist support is added only when
/// OAuth client credentials are configured.
pub(crate) fn build_tools(config: &Config) -> Result<SongTools> {
    let embedder = Arc::new(load_embedder(config)?);
    let store: Arc<dyn VectorStore> = Arc::from(connect_store(config)?);
    let privacy: Privacy = config
        .playlist
        .privacy
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let mut tools = SongTools::new(embedder, store).with_default_privacy(privacy);

    if config.playlist.client_id.is_some() && config.playlist.client_secret.is_some() {
        let credentials = config
            .credentials_path()
            .context("could not determine credentials path")?;
        let client = YouTubePlaylistClient::from_config(&config.playlist, credentials)
            .context("failed to create playlist client")?;
        tools = tools.with_playlist(Arc::new(client));
    } else {
        tracing::debug!("playlist credentials not configured");
    }

    Ok(tools)
}
