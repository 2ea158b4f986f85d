pub mod batch;
pub mod corpus;
pub mod embedding;
pub mod ingest;
pub mod playlist;
pub mod vector_store;

pub use batch::{BatchExt, Batches};
pub use corpus::{CorpusReader, CorpusStats};
pub use embedding::{Embedder, OnnxEmbedder};
pub use ingest::{BatchReport, IngestObserver, IngestStats, Ingestor};
pub use vector_store::{VectorStore, create_backend};
