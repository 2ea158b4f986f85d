use anyhow::Result;

use super::connect_store;
use crate::cli::output::{StatusInfo, get_formatter};
use crate::client::ToolClient;
use crate::models::{Config, OutputFormat, VectorDriver};

pub async fn handle_status(format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let client = ToolClient::from_config(&config);
    let server_idle_secs = if client.is_running() {
        client.status().await.ok().map(|s| s.idle_secs)
    } else {
        None
    };

    let model_dir = config.model_dir();
    let model_present = model_dir
        .as_ref()
        .is_some_and(|dir| dir.join("model.onnx").exists() && dir.join("tokenizer.json").exists());

    let (vector_store_connected, points) = match connect_store(&config) {
        Ok(store) => {
            let connected = store.health_check().await.unwrap_or(false);
            let points = if connected {
                store
                    .collection_info()
                    .await
                    .ok()
                    .flatten()
                    .map(|info| info.points_count)
            } else {
                None
            };
            (connected, points)
        }
        Err(_) => (false, None),
    };

    let status = StatusInfo {
        server_running: server_idle_secs.is_some(),
        server_idle_secs,
        embedding_model: config.embedding.model_id.clone(),
        model_dir: model_dir.map(|d| d.display().to_string()),
        model_present,
        vector_store_driver: config.vector_store.driver.to_string(),
        vector_store_url: config.vector_store.url.clone(),
        vector_store_connected,
        collection: config.vector_store.collection.clone(),
        points,
        playlist_configured: config.playlist.client_id.is_some()
            && config.playlist.client_secret.is_some(),
    };

    print!("{}", formatter.format_status(&status));

    if !model_present || !vector_store_connected {
        eprintln!();
        if !model_present {
            eprintln!("Hint: export all-MiniLM-L6-v2 to ONNX and place model.onnx and tokenizer.json");
            eprintln!("      in the model directory, or set VIBECURATOR_MODEL_DIR.");
        }
        if !vector_store_connected && config.vector_store.driver == VectorDriver::Qdrant {
            eprintln!("Warning: Qdrant not running. Start with: docker run -p 6334:6334 qdrant/qdrant");
        }
    }

    Ok(())
}
