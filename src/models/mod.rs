mod config;
mod search;
mod song;

pub use config::{
    Config, DEFAULT_BATCH_SIZE, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_DIMENSION,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_QDRANT_URL, EmbeddingConfig, IngestConfig, PlaylistConfig,
    SearchConfig, ServerConfig, VectorDriver, VectorStoreConfig,
};
pub use search::{CollectionStats, OutputFormat, SearchResults, SongHit};
pub use song::{
    CorpusRecord, EMBED_LYRICS_CHARS, IdStrategy, IndexedPoint, PREVIEW_CHARS, SongPayload,
    SongRecord,
};
