//! Error types for vibecurator.

use thiserror::Error;

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model not found: {0}")]
    NotFound(String),

    #[error("failed to load embedding model: {0}")]
    LoadError(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("inference error: {0}")]
    InferenceError(String),

    #[error("invalid embedding output: {0}")]
    InvalidOutput(String),
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector store: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("search error: {0}")]
    SearchError(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors raised while reading a song corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

/// Errors related to ingestion runs.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid batch size: {0}")]
    InvalidBatchSize(usize),

    #[error("failed to prepare collection: {0}")]
    Collection(#[source] VectorStoreError),

    #[error("batch {batch} failed to embed: {source}")]
    Embedding {
        batch: usize,
        #[source]
        source: EmbeddingError,
    },

    #[error("batch {batch} failed to upsert: {source}")]
    Upsert {
        batch: usize,
        #[source]
        source: VectorStoreError,
    },

    #[error("embedder returned {actual} vectors for {expected} texts")]
    EmbeddingCount { expected: usize, actual: usize },

    #[error("failed to read corpus after {songs_upserted} songs: {source}")]
    Corpus {
        songs_upserted: usize,
        #[source]
        source: CorpusError,
    },
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors related to the playlist side effect.
#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("credentials unavailable: {0}")]
    CredentialsUnavailable(String),

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("playlist request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("playlist API error: {0}")]
    ApiError(String),

    #[error("invalid playlist API response: {0}")]
    InvalidResponse(String),

    #[error("credential cache error: {0}")]
    CacheError(String),

    #[error("none of the requested tracks were found")]
    NoTracksFound,
}

/// Errors related to the tool server and its client.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("tool server not running")]
    NotRunning,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("socket error: {0}")]
    SocketError(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("playlist error: {0}")]
    Playlist(#[from] PlaylistError),

    #[error("server error: {0}")]
    Server(#[from] ServerError),

    #[error("infrastructure not running: {0}")]
    InfrastructureError(String),
}
