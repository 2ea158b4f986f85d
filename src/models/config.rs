use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::search::OutputFormat;
use super::song::IdStrategy;
use crate::error::ConfigError;

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
/// gRPC port. The client here does not speak Qdrant's REST API on 6333.
pub const DEFAULT_QDRANT_PORT: u16 = 6334;
pub const QDRANT_REST_PORT: u16 = 6333;
pub const DEFAULT_COLLECTION: &str = "songs";
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;
pub const DEFAULT_BATCH_SIZE: u32 = 100;
pub const DEFAULT_YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 1800;

const APP_DIR: &str = "vibecurator";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub playlist: PlaylistConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join("config.toml"))
    }

    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join(APP_DIR))
    }

    pub fn models_dir() -> Option<PathBuf> {
        Self::data_dir().map(|p| p.join("models"))
    }

    /// Directory holding the ONNX model and tokenizer for the configured model id.
    pub fn model_dir(&self) -> Option<PathBuf> {
        if let Some(ref path) = self.embedding.model_path {
            return Some(path.clone());
        }
        Self::models_dir().map(|p| p.join(self.embedding.model_id.replace('/', "--")))
    }

    pub fn socket_path(&self) -> PathBuf {
        self.server.socket_path.clone().unwrap_or_else(|| {
            Self::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("vibecurator.sock")
        })
    }

    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.playlist
            .credentials_path
            .clone()
            .or_else(|| Self::data_dir().map(|p| p.join("youtube_credentials.json")))
    }

    /// Load the config file (if any), then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Apply environment overrides using the given lookup.
    ///
    /// `QDRANT_URL` wins over `QDRANT_HOST`/`QDRANT_PORT`.
    pub fn apply_env_with(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(url) = get("QDRANT_URL") {
            self.vector_store.url = url;
        } else if let Some(host) = get("QDRANT_HOST") {
            let port = get("QDRANT_PORT")
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(DEFAULT_QDRANT_PORT);
            self.vector_store.url = format!("http://{host}:{port}");
        }
        if let Some(key) = get("QDRANT_API_KEY") {
            self.vector_store.api_key = Some(key);
        }
        if let Some(collection) = get("VIBECURATOR_COLLECTION") {
            self.vector_store.collection = collection;
        }
        if let Some(dir) = get("VIBECURATOR_MODEL_DIR") {
            self.embedding.model_path = Some(PathBuf::from(dir));
        }
        if let Some(id) = get("YOUTUBE_CLIENT_ID") {
            self.playlist.client_id = Some(id);
        }
        if let Some(secret) = get("YOUTUBE_CLIENT_SECRET") {
            self.playlist.client_secret = Some(secret);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "ingest.batch_size must be at least 1".to_string(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimension must be at least 1".to_string(),
            ));
        }
        if self.vector_store.collection.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "vector_store.collection cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model_id() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_max_tokens() -> u32 {
    256
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            model_path: None,
            dimension: default_dimension(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Vector store backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDriver {
    #[default]
    Qdrant,
    /// In-process store; contents live only as long as the process.
    Memory,
}

impl std::fmt::Display for VectorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorDriver::Qdrant => write!(f, "qdrant"),
            VectorDriver::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub driver: VectorDriver,

    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            driver: VectorDriver::default(),
            url: default_qdrant_url(),
            collection: default_collection(),
            api_key: None,
        }
    }
}

impl VectorStoreConfig {
    /// True when `url` names Qdrant's REST port instead of the gRPC one.
    pub fn points_at_rest_port(&self) -> bool {
        let authority = self
            .url
            .split_once("://")
            .map_or(self.url.as_str(), |(_, rest)| rest);
        let authority = authority.split('/').next().unwrap_or_default();
        authority
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse::<u16>().ok())
            == Some(QDRANT_REST_PORT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default)]
    pub id_strategy: IdStrategy,
}

fn default_batch_size() -> u32 {
    DEFAULT_BATCH_SIZE
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            id_strategy: IdStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    #[serde(default)]
    pub default_format: OutputFormat,
}

fn default_limit() -> u32 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_format: OutputFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_privacy")]
    pub privacy: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_YOUTUBE_API_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_OAUTH_TOKEN_URL.to_string()
}

fn default_privacy() -> String {
    "private".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            credentials_path: None,
            api_url: default_api_url(),
            token_url: default_token_url(),
            privacy: default_privacy(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_idle_timeout() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.vector_store.url, DEFAULT_QDRANT_URL);
        assert_eq!(config.vector_store.collection, DEFAULT_COLLECTION);
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.ingest.batch_size, 100);
        assert_eq!(config.ingest.id_strategy, IdStrategy::Random);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.is_some());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [vector_store]
            collection = "lyrics"

            [ingest]
            id_strategy = "content"
            "#,
        )
        .unwrap();
        assert_eq!(config.vector_store.collection, "lyrics");
        assert_eq!(config.vector_store.url, DEFAULT_QDRANT_URL);
        assert_eq!(config.ingest.id_strategy, IdStrategy::Content);
        assert_eq!(config.ingest.batch_size, 100);
    }

    #[test]
    fn test_env_host_and_port() {
        let mut config = Config::default();
        config.apply_env_with(env(&[("QDRANT_HOST", "qdrant"), ("QDRANT_PORT", "7000")]));
        assert_eq!(config.vector_store.url, "http://qdrant:7000");
    }

    #[test]
    fn test_rest_port_is_detected() {
        let mut config = Config::default();
        assert!(!config.vector_store.points_at_rest_port());

        config.apply_env_with(env(&[("QDRANT_HOST", "qdrant"), ("QDRANT_PORT", "6333")]));
        assert!(config.vector_store.points_at_rest_port());

        config.vector_store.url = "http://localhost:6333/".to_string();
        assert!(config.vector_store.points_at_rest_port());
        config.vector_store.url = "https://cloud.example.com".to_string();
        assert!(!config.vector_store.points_at_rest_port());
    }

    #[test]
    fn test_env_url_wins_over_host() {
        let mut config = Config::default();
        config.apply_env_with(env(&[
            ("QDRANT_URL", "http://remote:6334"),
            ("QDRANT_HOST", "ignored"),
        ]));
        assert_eq!(config.vector_store.url, "http://remote:6334");
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut config = Config::default();
        config.ingest.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_dir_from_model_id() {
        let config = Config::default();
        if let Some(dir) = config.model_dir() {
            assert!(dir.ends_with("sentence-transformers--all-MiniLM-L6-v2"));
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\ndefault_limit = 25\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.search.default_limit, 25);
    }
}
