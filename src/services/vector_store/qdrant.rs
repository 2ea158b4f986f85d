//! Qdrant vector store backend implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Filter, PointId, PointStruct, ScrollPointsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{CollectionInfo, CollectionStatus, Distance, PayloadFilter, ScoredPoint, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{IndexedPoint, SongPayload, VectorStoreConfig};

/// Qdrant vector store backend.
pub struct QdrantBackend {
    client: Qdrant,
    collection: String,
    /// Vector size of the collection, fetched on first use. `None` when the
    /// collection uses named vectors.
    vector_size: OnceCell<Option<usize>>,
}

impl QdrantBackend {
    pub fn new(config: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        if config.points_at_rest_port() {
            warn!(
                url = %config.url,
                "6333 is Qdrant's REST port; the gRPC client usually needs 6334"
            );
        }
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            vector_size: OnceCell::new(),
        })
    }

    /// Create a backend with default configuration.
    pub fn with_defaults() -> Result<Self, VectorStoreError> {
        Self::new(&VectorStoreConfig::default())
    }

    /// Fail with `CollectionNotFound` when the collection is absent and with
    /// `DimensionMismatch` when `actual` differs from its vector size.
    async fn check_vector(&self, actual: usize) -> Result<(), VectorStoreError> {
        let expected = self
            .vector_size
            .get_or_try_init(|| async {
                let exists = self
                    .client
                    .collection_exists(&self.collection)
                    .await
                    .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;
                if !exists {
                    return Err(VectorStoreError::CollectionNotFound(self.collection.clone()));
                }
                let info = self
                    .client
                    .collection_info(&self.collection)
                    .await
                    .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;
                let size = info.result.as_ref().and_then(configured_vector_size);
                debug!(collection = %self.collection, ?size, "loaded vector size");
                Ok(size)
            })
            .await?;
        check_dimension(*expected, actual)
    }

    async fn ensure_exists(&self) -> Result<(), VectorStoreError> {
        if self.vector_size.initialized() {
            return Ok(());
        }
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;
        if exists {
            Ok(())
        } else {
            Err(VectorStoreError::CollectionNotFound(self.collection.clone()))
        }
    }

    fn to_filter(filter: &PayloadFilter) -> Filter {
        let conditions: Vec<Condition> = filter
            .must
            .iter()
            .map(|m| Condition::matches(m.key.clone(), m.value.clone()))
            .collect();
        Filter::must(conditions)
    }
}

fn to_qdrant_distance(distance: Distance) -> qdrant_client::qdrant::Distance {
    match distance {
        Distance::Cosine => qdrant_client::qdrant::Distance::Cosine,
        Distance::Dot => qdrant_client::qdrant::Distance::Dot,
        Distance::Euclid => qdrant_client::qdrant::Distance::Euclid,
    }
}

fn configured_vector_size(info: &qdrant_client::qdrant::CollectionInfo) -> Option<usize> {
    let vectors = info.config.as_ref()?.params.as_ref()?.vectors_config.as_ref()?;
    match vectors.config.as_ref()? {
        VectorsConfigKind::Params(params) => Some(params.size as usize),
        VectorsConfigKind::ParamsMap(_) => None,
    }
}

fn check_dimension(expected: Option<usize>, actual: usize) -> Result<(), VectorStoreError> {
    match expected {
        Some(expected) if expected != actual => {
            Err(VectorStoreError::DimensionMismatch { expected, actual })
        }
        _ => Ok(()),
    }
}

fn to_status(status: qdrant_client::qdrant::CollectionStatus) -> CollectionStatus {
    use qdrant_client::qdrant::CollectionStatus as Q;
    match status {
        Q::Green => CollectionStatus::Green,
        Q::Yellow => CollectionStatus::Yellow,
        Q::Grey => CollectionStatus::Grey,
        Q::Red => CollectionStatus::Red,
        _ => CollectionStatus::Unknown,
    }
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> String {
    payload
        .get(key)
        .and_then(|v| match &v.kind {
            Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn to_song_payload(payload: &HashMap<String, Value>) -> SongPayload {
    SongPayload {
        artist: payload_string(payload, SongPayload::ARTIST),
        song: payload_string(payload, SongPayload::SONG),
        link: payload_string(payload, SongPayload::LINK),
        text_preview: payload_string(payload, SongPayload::TEXT_PREVIEW),
    }
}

fn point_id_string(id: Option<&PointId>) -> String {
    match id.and_then(|id| id.point_id_options.as_ref()) {
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid)) => uuid.clone(),
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

fn to_point_struct(point: IndexedPoint) -> PointStruct {
    let mut payload: HashMap<String, Value> = HashMap::new();
    payload.insert(SongPayload::ARTIST.to_string(), point.payload.artist.into());
    payload.insert(SongPayload::SONG.to_string(), point.payload.song.into());
    payload.insert(SongPayload::LINK.to_string(), point.payload.link.into());
    payload.insert(
        SongPayload::TEXT_PREVIEW.to_string(),
        point.payload.text_preview.into(),
    );
    PointStruct::new(point.id.to_string(), point.vector, payload)
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;
        if !exists {
            return Ok(None);
        }

        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        Ok(Some(info.result.map_or(
            CollectionInfo {
                points_count: 0,
                status: CollectionStatus::Unknown,
            },
            |r| CollectionInfo {
                points_count: r.points_count.unwrap_or(0),
                status: to_status(r.status()),
            },
        )))
    }

    async fn ensure_collection(
        &self,
        dimension: usize,
        distance: Distance,
    ) -> Result<(), VectorStoreError> {
        if self.collection_info().await?.is_some() {
            debug!(collection = %self.collection, "collection exists");
            return Ok(());
        }

        let create_collection = CreateCollectionBuilder::new(&self.collection).vectors_config(
            VectorParamsBuilder::new(dimension as u64, to_qdrant_distance(distance)),
        );

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        info!(collection = %self.collection, dimension, "created collection");
        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexedPoint>) -> Result<(), VectorStoreError> {
        if points.is_empty() {
            return Ok(());
        }

        for point in &points {
            self.check_vector(point.vector.len()).await?;
        }

        let points: Vec<PointStruct> = points.into_iter().map(to_point_struct).collect();
        let upsert = UpsertPointsBuilder::new(&self.collection, points).wait(true);

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        self.check_vector(vector.len()).await?;

        let mut search_builder =
            SearchPointsBuilder::new(&self.collection, vector, top_k).with_payload(true);

        if let Some(f) = filter.filter(|f| !f.is_empty()) {
            search_builder = search_builder.filter(Self::to_filter(f));
        }

        let results = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| VectorStoreError::SearchError(e.to_string()))?;

        Ok(results
            .result
            .into_iter()
            .map(|point| ScoredPoint {
                id: point_id_string(point.id.as_ref()),
                score: point.score,
                payload: to_song_payload(&point.payload),
            })
            .collect())
    }

    async fn scan(
        &self,
        filter: &PayloadFilter,
        limit: u64,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        self.ensure_exists().await?;

        let mut scroll_builder = ScrollPointsBuilder::new(&self.collection)
            .limit(u32::try_from(limit).unwrap_or(u32::MAX))
            .with_payload(true)
            .with_vectors(false);

        if !filter.is_empty() {
            scroll_builder = scroll_builder.filter(Self::to_filter(filter));
        }

        let response = self
            .client
            .scroll(scroll_builder)
            .await
            .map_err(|e| VectorStoreError::SearchError(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .map(|point| ScoredPoint {
                id: point_id_string(point.id.as_ref()),
                score: 0.0,
                payload: to_song_payload(&point.payload),
            })
            .collect())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_backend_creation() {
        assert!(QdrantBackend::with_defaults().is_ok());
    }

    #[test]
    fn test_point_struct_payload() {
        let id = Uuid::new_v4();
        let point = IndexedPoint::new(
            id,
            vec![0.1, 0.2],
            SongPayload {
                artist: "ABBA".to_string(),
                song: "SOS".to_string(),
                link: "/a/abba/sos".to_string(),
                text_preview: "Where are those happy days".to_string(),
            },
        );
        let ps = to_point_struct(point);
        assert_eq!(point_id_string(ps.id.as_ref()), id.to_string());
        let payload = to_song_payload(&ps.payload);
        assert_eq!(payload.artist, "ABBA");
        assert_eq!(payload.link, "/a/abba/sos");
    }

    #[test]
    fn test_filter_conversion() {
        let filter = QdrantBackend::to_filter(&PayloadFilter::artist("ABBA"));
        assert_eq!(filter.must.len(), 1);
    }

    fn collection_with(config: Option<VectorsConfigKind>) -> qdrant_client::qdrant::CollectionInfo {
        use qdrant_client::qdrant::{CollectionConfig, CollectionParams, VectorsConfig};
        qdrant_client::qdrant::CollectionInfo {
            config: Some(CollectionConfig {
                params: Some(CollectionParams {
                    vectors_config: Some(VectorsConfig { config }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_configured_vector_size() {
        use qdrant_client::qdrant::{VectorParams, VectorParamsMap};

        let single = collection_with(Some(VectorsConfigKind::Params(VectorParams {
            size: 384,
            ..Default::default()
        })));
        assert_eq!(configured_vector_size(&single), Some(384));

        let named = collection_with(Some(VectorsConfigKind::ParamsMap(
            VectorParamsMap::default(),
        )));
        assert_eq!(configured_vector_size(&named), None);
        assert_eq!(
            configured_vector_size(&qdrant_client::qdrant::CollectionInfo::default()),
            None
        );
    }

    #[test]
    fn test_check_dimension() {
        assert!(check_dimension(Some(384), 384).is_ok());
        assert!(check_dimension(None, 12).is_ok());
        assert!(matches!(
            check_dimension(Some(384), 256),
            Err(VectorStoreError::DimensionMismatch {
                expected: 384,
                actual: 256
            })
        ));
    }

    #[test]
    fn test_missing_payload_field_is_empty() {
        let payload = HashMap::new();
        assert_eq!(payload_string(&payload, "artist"), "");
    }
}
