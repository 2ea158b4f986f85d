//! Test doubles shared by unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{EmbeddingError, PlaylistError, VectorStoreError};
use crate::models::IndexedPoint;
use crate::services::embedding::{Embedder, normalize};
use crate::services::playlist::{PlaylistOutcome, PlaylistRequest, PlaylistService, Track};
use crate::services::vector_store::{
    CollectionInfo, Distance, MemoryBackend, PayloadFilter, ScoredPoint, VectorStore,
};

/// Deterministic bag-of-words embedder: each word lands in a hashed bucket.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn bucket(&self, word: &str) -> usize {
        // FNV-1a, stable across runs unlike std's RandomState.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in word.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        (hash % self.dimension as u64) as usize
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0f32; self.dimension];
                for word in text.split_whitespace() {
                    v[self.bucket(&word.to_lowercase())] += 1.0;
                }
                normalize(&v)
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Embedder that always fails.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::InferenceError("model offline".to_string()))
    }

    fn dimension(&self) -> usize {
        8
    }
}

/// Memory store that records upsert batch sizes and can fail on a given call.
pub struct RecordingStore {
    inner: MemoryBackend,
    pub upserts: Mutex<Vec<usize>>,
    fail_on_upsert: Option<usize>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryBackend::new("songs"),
            upserts: Mutex::new(Vec::new()),
            fail_on_upsert: None,
        }
    }

    /// Fail the `n`-th upsert call (zero-based).
    pub fn failing_on(n: usize) -> Self {
        Self {
            fail_on_upsert: Some(n),
            ..Self::new()
        }
    }

    pub fn upsert_sizes(&self) -> Vec<usize> {
        self.upserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.inner.health_check().await
    }

    async fn collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        self.inner.collection_info().await
    }

    async fn ensure_collection(
        &self,
        dimension: usize,
        distance: Distance,
    ) -> Result<(), VectorStoreError> {
        self.inner.ensure_collection(dimension, distance).await
    }

    async fn upsert(&self, points: Vec<IndexedPoint>) -> Result<(), VectorStoreError> {
        let call = {
            let mut upserts = self.upserts.lock().unwrap();
            upserts.push(points.len());
            upserts.len() - 1
        };
        if self.fail_on_upsert == Some(call) {
            return Err(VectorStoreError::UpsertError("injected failure".to_string()));
        }
        self.inner.upsert(points).await
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        self.inner.query(vector, top_k, filter).await
    }

    async fn scan(
        &self,
        filter: &PayloadFilter,
        limit: u64,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        self.inner.scan(filter, limit).await
    }

    fn collection(&self) -> &str {
        self.inner.collection()
    }
}

/// Store whose every call fails as if the server were unreachable.
pub struct UnreachableStore;

#[async_trait]
impl VectorStore for UnreachableStore {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        Err(Self::down())
    }

    async fn collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        Err(Self::down())
    }

    async fn ensure_collection(&self, _: usize, _: Distance) -> Result<(), VectorStoreError> {
        Err(Self::down())
    }

    async fn upsert(&self, _: Vec<IndexedPoint>) -> Result<(), VectorStoreError> {
        Err(Self::down())
    }

    async fn query(
        &self,
        _: Vec<f32>,
        _: u64,
        _: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        Err(Self::down())
    }

    async fn scan(&self, _: &PayloadFilter, _: u64) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        Err(Self::down())
    }

    fn collection(&self) -> &str {
        "songs"
    }
}

impl UnreachableStore {
    fn down() -> VectorStoreError {
        VectorStoreError::ConnectionError("connection refused".to_string())
    }
}

/// Playlist service that "finds" every track whose artist is not "Unknown".
pub struct FakePlaylistService {
    pub requests: Mutex<Vec<PlaylistRequest>>,
}

impl FakePlaylistService {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PlaylistService for FakePlaylistService {
    async fn create_playlist(
        &self,
        request: PlaylistRequest,
    ) -> Result<PlaylistOutcome, PlaylistError> {
        let (found, not_found): (Vec<Track>, Vec<Track>) = request
            .tracks
            .iter()
            .cloned()
            .partition(|t| t.artist != "Unknown");
        self.requests.lock().unwrap().push(request);
        Ok(PlaylistOutcome {
            playlist_id: "PLfake".to_string(),
            playlist_url: "https://www.youtube.com/playlist?list=PLfake".to_string(),
            found,
            not_found,
        })
    }
}
