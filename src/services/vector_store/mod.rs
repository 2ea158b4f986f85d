//! Vector store abstraction layer.
//!
//! `VectorStore` is the seam between the song pipeline and a concrete backend:
//! Qdrant for real deployments, an in-process store for tests and offline runs.

mod memory;
mod qdrant;

pub use memory::MemoryBackend;
pub use qdrant::QdrantBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VectorStoreError;
use crate::models::{IndexedPoint, SongPayload, VectorDriver, VectorStoreConfig};

/// Distance metric of a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    #[default]
    Cosine,
    Dot,
    Euclid,
}

impl Distance {
    /// Whether larger scores mean closer points.
    pub fn higher_is_closer(self) -> bool {
        !matches!(self, Distance::Euclid)
    }
}

/// Health of a collection as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    Green,
    Yellow,
    Grey,
    Red,
    Unknown,
}

impl std::fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionStatus::Green => write!(f, "green"),
            CollectionStatus::Yellow => write!(f, "yellow"),
            CollectionStatus::Grey => write!(f, "grey"),
            CollectionStatus::Red => write!(f, "red"),
            CollectionStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Collection information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub points_count: u64,
    pub status: CollectionStatus,
}

/// Exact keyword match on a payload field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub key: String,
    pub value: String,
}

/// Conjunction of exact payload matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadFilter {
    pub must: Vec<FieldMatch>,
}

impl PayloadFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `key == value` condition.
    pub fn must_match(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.must.push(FieldMatch {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Filter on the exact artist name.
    pub fn artist(name: impl Into<String>) -> Self {
        Self::new().must_match(SongPayload::ARTIST, name)
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    pub fn matches(&self, payload: &SongPayload) -> bool {
        self.must
            .iter()
            .all(|m| payload.field(&m.key) == Some(m.value.as_str()))
    }
}

/// A point returned from a query or scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    /// Similarity under the collection metric; 0.0 for scans
    pub score: f32,
    pub payload: SongPayload,
}

/// Abstract trait for vector store operations.
///
/// No operation retries, and a failed `upsert` may have partially applied.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check if the vector store is healthy and accessible.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Get information about the collection. Returns None if it doesn't exist.
    async fn collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError>;

    /// Create the collection if absent. An existing collection is left untouched.
    async fn ensure_collection(
        &self,
        dimension: usize,
        distance: Distance,
    ) -> Result<(), VectorStoreError>;

    /// Insert or overwrite points by id.
    async fn upsert(&self, points: Vec<IndexedPoint>) -> Result<(), VectorStoreError>;

    /// Up to `top_k` points closest to `vector`, best first.
    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError>;

    /// Up to `limit` points matching `filter`, in no particular order.
    async fn scan(
        &self,
        filter: &PayloadFilter,
        limit: u64,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError>;

    /// Get the collection name.
    fn collection(&self) -> &str;
}

/// Create a vector store backend based on configuration.
pub fn create_backend(config: &VectorStoreConfig) -> Result<Box<dyn VectorStore>, VectorStoreError> {
    match config.driver {
        VectorDriver::Qdrant => Ok(Box::new(QdrantBackend::new(config)?)),
        VectorDriver::Memory => Ok(Box::new(MemoryBackend::new(&config.collection))),
    }
}
