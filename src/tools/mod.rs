//! Agent-facing song tools.
//!
//! Every operation returns a [`ToolError`] instead of failing hard, so an agent
//! runtime always gets a well-formed answer it can relay to the user.

mod definitions;

pub use definitions::{AGENT_INSTRUCTIONS, ToolDefinition, tool_definitions};

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{EmbeddingError, PlaylistError, VectorStoreError};
use crate::models::{CollectionStats, SearchResults, SongHit};
use crate::services::embedding::Embedder;
use crate::services::playlist::{PlaylistRequest, PlaylistService, Privacy, Track};
use crate::services::vector_store::{PayloadFilter, VectorStore};

pub const SEARCH_SONGS: &str = "search_songs";
pub const SEARCH_SONGS_BY_ARTIST: &str = "search_songs_by_artist";
pub const GET_COLLECTION_STATS: &str = "get_collection_stats";
pub const CREATE_PLAYLIST: &str = "create_youtube_playlist";

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 50;

/// Clamp a requested result count into `[1, MAX_LIMIT]`.
pub fn clamp_limit(limit: Option<i64>) -> u64 {
    match limit {
        Some(n) => n.clamp(1, MAX_LIMIT as i64) as u64,
        None => DEFAULT_LIMIT,
    }
}

fn round_score(score: f32) -> f32 {
    (score * 10_000.0).round() / 10_000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    InvalidArguments,
    Embedding,
    StoreUnavailable,
    CollectionMissing,
    SchemaMismatch,
    PlaylistUnavailable,
    Playlist,
    UnknownTool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidArguments, message)
    }
}

impl From<EmbeddingError> for ToolError {
    fn from(err: EmbeddingError) -> Self {
        Self::new(ToolErrorKind::Embedding, err.to_string())
    }
}

impl From<VectorStoreError> for ToolError {
    fn from(err: VectorStoreError) -> Self {
        let kind = match err {
            VectorStoreError::CollectionNotFound(_) => ToolErrorKind::CollectionMissing,
            VectorStoreError::DimensionMismatch { .. } => ToolErrorKind::SchemaMismatch,
            _ => ToolErrorKind::StoreUnavailable,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<PlaylistError> for ToolError {
    fn from(err: PlaylistError) -> Self {
        let kind = match err {
            PlaylistError::CredentialsUnavailable(_) => ToolErrorKind::PlaylistUnavailable,
            _ => ToolErrorKind::Playlist,
        };
        Self::new(kind, err.to_string())
    }
}

/// A tool invocation by name with a JSON arguments object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// `{"ok":true,"data":...}` or `{"ok":false,"error":{"kind":...,"message":...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolResponse {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: ToolError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ArtistArgs {
    #[serde(alias = "artist")]
    artist_name: String,
    #[serde(default)]
    limit: Option<i64>,
}

/// Songs given either as a list or as a JSON string holding that list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TrackList {
    List(Vec<Track>),
    Json(String),
}

impl TrackList {
    pub fn into_tracks(self) -> Result<Vec<Track>, ToolError> {
        match self {
            TrackList::List(tracks) => Ok(tracks),
            TrackList::Json(raw) => serde_json::from_str(&raw).map_err(|e| {
                ToolError::invalid(format!("songs is not a JSON list of {{artist, song}}: {e}"))
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistArgs {
    pub title: String,
    pub songs: TrackList,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub privacy: Option<String>,
}

/// Agent-facing result of a playlist creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub playlist_url: String,
    pub found: Vec<Track>,
    pub not_found: Vec<Track>,
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::invalid(e.to_string()))
}

fn to_data<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::invalid(e.to_string()))
}

/// The song tools with their collaborators injected.
#[derive(Clone)]
pub struct SongTools {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    playlist: Option<Arc<dyn PlaylistService>>,
    default_privacy: Privacy,
}

impl SongTools {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            playlist: None,
            default_privacy: Privacy::default(),
        }
    }

    pub fn with_playlist(mut self, playlist: Arc<dyn PlaylistService>) -> Self {
        self.playlist = Some(playlist);
        self
    }

    pub fn with_default_privacy(mut self, privacy: Privacy) -> Self {
        self.default_privacy = privacy;
        self
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    /// Semantic search. Results are in descending score order.
    pub async fn search_songs(
        &self,
        query: &str,
        limit: Option<i64>,
    ) -> Result<SearchResults, ToolError> {
        if query.trim().is_empty() {
            return Err(ToolError::invalid("query must not be empty"));
        }
        let start = Instant::now();
        let limit = clamp_limit(limit);

        let vector = self.embedder.embed_one(query)?;
        let points = self.store.query(vector, limit, None).await?;

        let hits = points
            .into_iter()
            .map(|p| SongHit::from_payload(p.payload, Some(round_score(p.score))))
            .collect();
        let elapsed = start.elapsed().as_millis() as u64;
        debug!(query, limit, elapsed_ms = elapsed, "semantic search");
        Ok(SearchResults::new(query.to_string(), hits, elapsed))
    }

    /// Songs whose artist equals `artist` exactly. Unranked.
    pub async fn search_songs_by_artist(
        &self,
        artist: &str,
        limit: Option<i64>,
    ) -> Result<SearchResults, ToolError> {
        if artist.trim().is_empty() {
            return Err(ToolError::invalid("artist_name must not be empty"));
        }
        let start = Instant::now();
        let limit = clamp_limit(limit);

        let points = self.store.scan(&PayloadFilter::artist(artist), limit).await?;
        let hits = points
            .into_iter()
            .map(|p| SongHit::from_payload(p.payload, None))
            .collect();
        Ok(SearchResults::new(
            artist.to_string(),
            hits,
            start.elapsed().as_millis() as u64,
        ))
    }

    pub async fn get_collection_stats(&self) -> Result<CollectionStats, ToolError> {
        let collection = self.store.collection().to_string();
        match self.store.collection_info().await? {
            Some(info) => Ok(CollectionStats {
                total_songs: info.points_count,
                collection_name: collection,
                status: info.status.to_string(),
            }),
            None => Err(ToolError::new(
                ToolErrorKind::CollectionMissing,
                format!("collection '{}' does not exist", collection),
            )),
        }
    }

    pub async fn create_youtube_playlist(
        &self,
        args: PlaylistArgs,
    ) -> Result<PlaylistSummary, ToolError> {
        let service = self.playlist.as_ref().ok_or_else(|| {
            ToolError::new(
                ToolErrorKind::PlaylistUnavailable,
                "playlist creation is not configured",
            )
        })?;

        if args.title.trim().is_empty() {
            return Err(ToolError::invalid("title must not be empty"));
        }
        let tracks = args.songs.into_tracks()?;
        if tracks.is_empty() {
            return Err(ToolError::invalid("songs must not be empty"));
        }
        let privacy = match args.privacy.as_deref() {
            Some(p) => p.parse::<Privacy>().map_err(ToolError::invalid)?,
            None => self.default_privacy,
        };

        let outcome = service
            .create_playlist(PlaylistRequest {
                title: args.title,
                description: args.description.unwrap_or_default(),
                privacy,
                tracks,
            })
            .await?;

        Ok(PlaylistSummary {
            playlist_url: outcome.playlist_url,
            found: outcome.found,
            not_found: outcome.not_found,
        })
    }

    /// Run a tool call and wrap the outcome in a [`ToolResponse`].
    pub async fn dispatch(&self, call: ToolCall) -> ToolResponse {
        let name = call.name.clone();
        match self.run(call).await {
            Ok(data) => ToolResponse::success(data),
            Err(error) => {
                warn!(tool = %name, kind = ?error.kind, error = %error.message, "tool call failed");
                ToolResponse::failure(error)
            }
        }
    }

    async fn run(&self, call: ToolCall) -> Result<Value, ToolError> {
        match call.name.as_str() {
            SEARCH_SONGS => {
                let args: SearchArgs = parse_args(call.arguments)?;
                let results = self.search_songs(&args.query, args.limit).await?;
                to_data(&results.results)
            }
            SEARCH_SONGS_BY_ARTIST => {
                let args: ArtistArgs = parse_args(call.arguments)?;
                let results = self
                    .search_songs_by_artist(&args.artist_name, args.limit)
                    .await?;
                to_data(&results.results)
            }
            GET_COLLECTION_STATS => to_data(&self.get_collection_stats().await?),
            CREATE_PLAYLIST => {
                let args: PlaylistArgs = parse_args(call.arguments)?;
                to_data(&self.create_youtube_playlist(args).await?)
            }
            other => Err(ToolError::new(
                ToolErrorKind::UnknownTool,
                format!("unknown tool: {}", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SongRecord;
    use crate::services::ingest::{BatchReport, Ingestor};
    use crate::services::vector_store::MemoryBackend;
    use crate::testing::{FakePlaylistService, HashEmbedder, UnreachableStore};
    use serde_json::json;

    const DIM: usize = 256;

    fn corpus() -> Vec<SongRecord> {
        let mut songs = vec![
            SongRecord::new("ABBA", "SOS", "so strange where are those happy days", "/a/abba/sos"),
            SongRecord::new("ABBA", "Waterloo", "my my at waterloo napoleon did surrender", "/a/abba/waterloo"),
            SongRecord::new("Abba Tribute", "SOS", "cover of happy days", "/a/tribute/sos"),
            SongRecord::new("Queen", "Bicycle Race", "i want to ride my bicycle", "/q/queen/bicycle"),
            SongRecord::new("Adele", "Hello", "hello from the other side rain", "/a/adele/hello"),
        ];
        for i in 0..60 {
            songs.push(SongRecord::new(
                "Filler",
                format!("Track {i}"),
                format!("filler words number {i}"),
                "",
            ));
        }
        songs
    }

    async fn tools() -> SongTools {
        let embedder = Arc::new(HashEmbedder::new(DIM));
        let store = Arc::new(MemoryBackend::new("songs"));
        Ingestor::new(embedder.as_ref(), store.as_ref())
            .ingest(corpus(), &mut |_: &BatchReport| {})
            .await
            .unwrap();
        SongTools::new(embedder, store)
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), 10);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-5)), 1);
        assert_eq!(clamp_limit(Some(7)), 7);
        assert_eq!(clamp_limit(Some(500)), 50);
    }

    #[test]
    fn test_round_score() {
        assert_eq!(round_score(0.123_456), 0.1235);
    }

    #[tokio::test]
    async fn test_search_is_bounded_and_sorted() {
        let tools = tools().await;
        let results = tools.search_songs("happy days", Some(100)).await.unwrap();

        assert_eq!(results.len(), 50);
        let scores: Vec<f32> = results.results.iter().filter_map(|h| h.score).collect();
        assert_eq!(scores.len(), results.len());
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert!(scores.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[tokio::test]
    async fn test_search_ranks_matching_lyrics_first() {
        let tools = tools().await;
        let results = tools.search_songs("ride my bicycle", Some(3)).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results.results[0].song, "Bicycle Race");
    }

    #[tokio::test]
    async fn test_artist_match_is_exact() {
        let tools = tools().await;
        let results = tools.search_songs_by_artist("ABBA", None).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.results.iter().all(|h| h.artist == "ABBA"));
        assert!(results.results.iter().all(|h| h.score.is_none()));

        let none = tools.search_songs_by_artist("abba", None).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_artist_limit() {
        let tools = tools().await;
        let results = tools.search_songs_by_artist("Filler", Some(5)).await.unwrap();
        assert_eq!(results.len(), 5);
    }

    #[tokio::test]
    async fn test_stats_on_empty_collection() {
        let store = Arc::new(MemoryBackend::new("songs"));
        store
            .ensure_collection(DIM, crate::services::vector_store::Distance::Cosine)
            .await
            .unwrap();
        let tools = SongTools::new(Arc::new(HashEmbedder::new(DIM)), store);

        let stats = tools.get_collection_stats().await.unwrap();
        assert_eq!(stats.total_songs, 0);
        assert_eq!(stats.collection_name, "songs");
    }

    #[tokio::test]
    async fn test_stats_on_missing_collection() {
        let tools = SongTools::new(
            Arc::new(HashEmbedder::new(DIM)),
            Arc::new(MemoryBackend::new("songs")),
        );
        let err = tools.get_collection_stats().await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::CollectionMissing);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_schema_error() {
        let store = Arc::new(MemoryBackend::new("songs"));
        store
            .ensure_collection(384, crate::services::vector_store::Distance::Cosine)
            .await
            .unwrap();
        let tools = SongTools::new(Arc::new(HashEmbedder::new(DIM)), store);

        let err = tools.search_songs("rain", None).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::SchemaMismatch);

        let response = tools
            .dispatch(ToolCall::new(SEARCH_SONGS, json!({"query": "rain"})))
            .await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error"]["kind"], "schema_mismatch");
    }

    #[tokio::test]
    async fn test_search_on_missing_collection() {
        let tools = SongTools::new(
            Arc::new(HashEmbedder::new(DIM)),
            Arc::new(MemoryBackend::new("songs")),
        );
        let err = tools.search_songs("rain", None).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::CollectionMissing);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_error_shaped() {
        let tools = SongTools::new(Arc::new(HashEmbedder::new(DIM)), Arc::new(UnreachableStore));
        let response = tools
            .dispatch(ToolCall::new(SEARCH_SONGS, json!({"query": "rain"})))
            .await;

        assert!(!response.ok);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error"]["kind"], "store_unavailable");
        assert!(value.get("data").is_none());
    }

    #[tokio::test]
    async fn test_dispatch_search() {
        let tools = tools().await;
        let response = tools
            .dispatch(ToolCall::new(SEARCH_SONGS, json!({"query": "rain", "limit": 2})))
            .await;

        assert!(response.ok);
        let data = response.data.unwrap();
        assert_eq!(data.as_array().unwrap().len(), 2);
        assert!(data[0].get("preview").is_some());
    }

    #[tokio::test]
    async fn test_dispatch_rejects_bad_arguments() {
        let tools = tools().await;
        let missing = tools
            .dispatch(ToolCall::new(SEARCH_SONGS, Value::Null))
            .await;
        assert_eq!(missing.error.unwrap().kind, ToolErrorKind::InvalidArguments);

        let blank = tools
            .dispatch(ToolCall::new(SEARCH_SONGS, json!({"query": "  "})))
            .await;
        assert_eq!(blank.error.unwrap().kind, ToolErrorKind::InvalidArguments);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let tools = tools().await;
        let response = tools.dispatch(ToolCall::new("play_music", json!({}))).await;
        assert_eq!(response.error.unwrap().kind, ToolErrorKind::UnknownTool);
    }

    #[tokio::test]
    async fn test_dispatch_stats() {
        let tools = tools().await;
        let response = tools
            .dispatch(ToolCall::new(GET_COLLECTION_STATS, Value::Null))
            .await;
        assert_eq!(response.data.unwrap()["total_songs"], 65);
    }

    #[tokio::test]
    async fn test_playlist_without_service() {
        let tools = tools().await;
        let response = tools
            .dispatch(ToolCall::new(
                CREATE_PLAYLIST,
                json!({"title": "Mix", "songs": [{"artist": "ABBA", "song": "SOS"}]}),
            ))
            .await;
        assert_eq!(response.error.unwrap().kind, ToolErrorKind::PlaylistUnavailable);
    }

    #[tokio::test]
    async fn test_playlist_accepts_json_string() {
        let service = Arc::new(FakePlaylistService::new());
        let tools = tools().await.with_playlist(service.clone());

        let songs = r#"[{"artist": "ABBA", "song": "SOS"}, {"artist": "Unknown", "song": "Nope"}]"#;
        let response = tools
            .dispatch(ToolCall::new(
                CREATE_PLAYLIST,
                json!({"title": "Mix", "songs": songs, "privacy": "unlisted"}),
            ))
            .await;

        assert!(response.ok);
        let summary: PlaylistSummary = serde_json::from_value(response.data.unwrap()).unwrap();
        assert_eq!(summary.found, vec![Track::new("ABBA", "SOS")]);
        assert_eq!(summary.not_found, vec![Track::new("Unknown", "Nope")]);

        let requests = service.requests.lock().unwrap();
        assert_eq!(requests[0].privacy, Privacy::Unlisted);
        assert_eq!(requests[0].title, "Mix");
    }

    #[tokio::test]
    async fn test_playlist_rejects_garbage_songs() {
        let tools = tools()
            .await
            .with_playlist(Arc::new(FakePlaylistService::new()));
        let response = tools
            .dispatch(ToolCall::new(
                CREATE_PLAYLIST,
                json!({"title": "Mix", "songs": "not json"}),
            ))
            .await;
        assert_eq!(response.error.unwrap().kind, ToolErrorKind::InvalidArguments);
    }

    #[test]
    fn test_response_shape() {
        let ok = serde_json::to_value(ToolResponse::success(json!([1]))).unwrap();
        assert_eq!(ok, json!({"ok": true, "data": [1]}));

        let err = serde_json::to_value(ToolResponse::failure(ToolError::new(
            ToolErrorKind::UnknownTool,
            "nope",
        )))
        .unwrap();
        assert_eq!(
            err,
            json!({"ok": false, "error": {"kind": "unknown_tool", "message": "nope"}})
        );
    }
}
