//! In-process vector store backend.
//!
//! Exact linear scan over every stored point. Suitable for tests and small
//! offline corpora; data is lost when the process exits.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use super::{CollectionInfo, CollectionStatus, Distance, PayloadFilter, ScoredPoint, VectorStore};
use crate::error::VectorStoreError;
use crate::models::IndexedPoint;

struct MemoryCollection {
    dimension: usize,
    distance: Distance,
    points: Vec<IndexedPoint>,
    positions: HashMap<uuid::Uuid, usize>,
}

impl MemoryCollection {
    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorStoreError> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// In-memory backend holding a single collection.
pub struct MemoryBackend {
    collection: String,
    state: RwLock<Option<MemoryCollection>>,
}

impl MemoryBackend {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            state: RwLock::new(None),
        }
    }

    fn poisoned() -> VectorStoreError {
        VectorStoreError::ConnectionError("memory store lock poisoned".to_string())
    }

    fn missing(&self) -> VectorStoreError {
        VectorStoreError::CollectionNotFound(self.collection.clone())
    }
}

fn score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    match distance {
        Distance::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        Distance::Cosine => {
            let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
            let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if na == 0.0 || nb == 0.0 {
                0.0
            } else {
                (dot / (na * nb)).clamp(-1.0, 1.0)
            }
        }
        Distance::Euclid => a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
    }
}

#[async_trait]
impl VectorStore for MemoryBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        Ok(true)
    }

    async fn collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state.as_ref().map(|c| CollectionInfo {
            points_count: c.points.len() as u64,
            status: CollectionStatus::Green,
        }))
    }

    async fn ensure_collection(
        &self,
        dimension: usize,
        distance: Distance,
    ) -> Result<(), VectorStoreError> {
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        if state.is_some() {
            return Ok(());
        }
        if dimension == 0 {
            return Err(VectorStoreError::CollectionError(
                "dimension must be at least 1".to_string(),
            ));
        }
        debug!(collection = %self.collection, dimension, "creating in-memory collection");
        *state = Some(MemoryCollection {
            dimension,
            distance,
            points: Vec::new(),
            positions: HashMap::new(),
        });
        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexedPoint>) -> Result<(), VectorStoreError> {
        if points.is_empty() {
            return Ok(());
        }
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        let collection = state.as_mut().ok_or_else(|| self.missing())?;

        // Points before a bad one stay applied, like a remote partial write.
        for point in points {
            collection.check_dimension(&point.vector)?;
            match collection.positions.get(&point.id) {
                Some(&idx) => collection.points[idx] = point,
                None => {
                    collection
                        .positions
                        .insert(point.id, collection.points.len());
                    collection.points.push(point);
                }
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        let collection = state.as_ref().ok_or_else(|| self.missing())?;
        collection.check_dimension(&vector)?;

        let mut scored: Vec<ScoredPoint> = collection
            .points
            .iter()
            .filter(|p| filter.is_none_or(|f| f.matches(&p.payload)))
            .map(|p| ScoredPoint {
                id: p.id.to_string(),
                score: score(collection.distance, &vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        if collection.distance.higher_is_closer() {
            scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        } else {
            scored.sort_by(|a, b| a.score.total_cmp(&b.score));
        }
        scored.truncate(usize::try_from(top_k).unwrap_or(usize::MAX));
        Ok(scored)
    }

    async fn scan(
        &self,
        filter: &PayloadFilter,
        limit: u64,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        let collection = state.as_ref().ok_or_else(|| self.missing())?;

        Ok(collection
            .points
            .iter()
            .filter(|p| filter.matches(&p.payload))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|p| ScoredPoint {
                id: p.id.to_string(),
                score: 0.0,
                payload: p.payload.clone(),
            })
            .collect())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
