//! YouTube Data API v3 playlist client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info};

use super::{
    CredentialProvider, FileCredentialProvider, OAuthCredentials, PlaylistOutcome,
    PlaylistRequest, PlaylistService, Privacy, Track,
};
use crate::error::PlaylistError;
use crate::models::PlaylistConfig;

pub fn playlist_url(playlist_id: &str) -> String {
    format!("https://www.youtube.com/playlist?list={playlist_id}")
}

fn search_query(track: &Track) -> String {
    format!("{} {}", track.artist, track.song)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId", default)]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistResource {
    id: String,
}

fn first_video_id(response: SearchResponse) -> Option<String> {
    response.items.into_iter().find_map(|item| item.id.video_id)
}

/// Builds playlists through the YouTube Data API.
pub struct YouTubePlaylistClient {
    http: Client,
    api_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl YouTubePlaylistClient {
    pub fn new(
        api_url: &str,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, PlaylistError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Build a client backed by the file credential cache described in `config`.
    pub fn from_config(
        config: &PlaylistConfig,
        credentials_path: std::path::PathBuf,
    ) -> Result<Self, PlaylistError> {
        let client_id = config.client_id.clone().ok_or_else(|| {
            PlaylistError::CredentialsUnavailable("YOUTUBE_CLIENT_ID is not set".to_string())
        })?;
        let client_secret = config.client_secret.clone().ok_or_else(|| {
            PlaylistError::CredentialsUnavailable("YOUTUBE_CLIENT_SECRET is not set".to_string())
        })?;
        let timeout = Duration::from_secs(config.timeout_secs);
        let provider = FileCredentialProvider::new(
            credentials_path,
            client_id,
            client_secret,
            config.token_url.clone(),
            timeout,
        )?;
        Self::new(&config.api_url, Arc::new(provider), timeout)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn check(response: Response) -> Result<Response, PlaylistError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(PlaylistError::ApiError(format!("status {}: {}", status, body)))
    }

    async fn search_video(
        &self,
        auth: &OAuthCredentials,
        track: &Track,
    ) -> Result<Option<String>, PlaylistError> {
        let query = search_query(track);
        let response = self
            .http
            .get(format!("{}/search", self.api_url))
            .bearer_auth(&auth.access_token)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", "1"),
                ("q", query.as_str()),
            ])
            .send()
            .await?;

        let search: SearchResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PlaylistError::InvalidResponse(e.to_string()))?;
        Ok(first_video_id(search))
    }

    async fn insert_playlist(
        &self,
        auth: &OAuthCredentials,
        title: &str,
        description: &str,
        privacy: Privacy,
    ) -> Result<String, PlaylistError> {
        let body = serde_json::json!({
            "snippet": { "title": title, "description": description },
            "status": { "privacyStatus": privacy.to_string() },
        });
        let response = self
            .http
            .post(format!("{}/playlists", self.api_url))
            .bearer_auth(&auth.access_token)
            .query(&[("part", "snippet,status")])
            .json(&body)
            .send()
            .await?;

        let playlist: PlaylistResource = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PlaylistError::InvalidResponse(e.to_string()))?;
        Ok(playlist.id)
    }

    async fn insert_item(
        &self,
        auth: &OAuthCredentials,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), PlaylistError> {
        let body = serde_json::json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": { "kind": "youtube#video", "videoId": video_id },
            },
        });
        let response = self
            .http
            .post(format!("{}/playlistItems", self.api_url))
            .bearer_auth(&auth.access_token)
            .query(&[("part", "snippet")])
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl PlaylistService for YouTubePlaylistClient {
    async fn create_playlist(
        &self,
        request: PlaylistRequest,
    ) -> Result<PlaylistOutcome, PlaylistError> {
        let auth = self.credentials.valid_credentials().await?;

        let mut found = Vec::new();
        let mut video_ids = Vec::new();
        let mut not_found = Vec::new();

        for track in request.tracks {
            match self.search_video(&auth, &track).await? {
                Some(video_id) => {
                    debug!(artist = %track.artist, song = %track.song, %video_id, "track found");
                    video_ids.push(video_id);
                    found.push(track);
                }
                None => {
                    debug!(artist = %track.artist, song = %track.song, "track not found");
                    not_found.push(track);
                }
            }
        }

        if found.is_empty() {
            return Err(PlaylistError::NoTracksFound);
        }

        let playlist_id = self
            .insert_playlist(&auth, &request.title, &request.description, request.privacy)
            .await?;
        for video_id in &video_ids {
            self.insert_item(&auth, &playlist_id, video_id).await?;
        }

        info!(
            playlist_id = %playlist_id,
            found = found.len(),
            not_found = not_found.len(),
            "playlist created"
        );

        Ok(PlaylistOutcome {
            playlist_url: playlist_url(&playlist_id),
            playlist_id,
            found,
            not_found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    struct StaticCredentials;

    #[async_trait]
    impl CredentialProvider for StaticCredentials {
        async fn valid_credentials(&self) -> Result<OAuthCredentials, PlaylistError> {
            Ok(OAuthCredentials {
                access_token: "token".to_string(),
                refresh_token: None,
                expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
                token_type: "Bearer".to_string(),
            })
        }

        async fn refresh(&self) -> Result<OAuthCredentials, PlaylistError> {
            self.valid_credentials().await
        }
    }

    /// Minimal HTTP server standing in for the Data API. Searches whose query
    /// mentions "Nobody" return no items. Request lines are recorded.
    async fn stub_api() -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let seen = seen.clone();
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut reader = BufReader::new(read);
                    let mut request_line = String::new();
                    reader.read_line(&mut request_line).await.unwrap();
                    let mut content_length = 0;
                    loop {
                        let mut header = String::new();
                        reader.read_line(&mut header).await.unwrap();
                        let header = header.trim();
                        if header.is_empty() {
                            break;
                        }
                        if let Some((name, value)) = header.split_once(':') {
                            if name.eq_ignore_ascii_case("content-length") {
                                content_length = value.trim().parse().unwrap();
                            }
                        }
                    }
                    let mut body = vec![0; content_length];
                    reader.read_exact(&mut body).await.unwrap();

                    let request_line = request_line.trim().to_string();
                    let path = request_line.split(' ').nth(1).unwrap_or_default();
                    let response = if path.starts_with("/search") {
                        if path.contains("Nobody") {
                            r#"{"items":[]}"#.to_string()
                        } else {
                            r#"{"items":[{"id":{"kind":"youtube#video","videoId":"vid1"}}]}"#
                                .to_string()
                        }
                    } else if path.starts_with("/playlists") {
                        r#"{"id":"PL42"}"#.to_string()
                    } else {
                        "{}".to_string()
                    };
                    seen.lock().unwrap().push(request_line);

                    let reply = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        response.len(),
                        response
                    );
                    write.write_all(reply.as_bytes()).await.unwrap();
                    write.shutdown().await.ok();
                });
            }
        });

        (format!("http://{addr}"), requests)
    }

    fn request(tracks: Vec<Track>) -> PlaylistRequest {
        PlaylistRequest {
            title: "Rainy day".to_string(),
            description: String::new(),
            privacy: Privacy::Unlisted,
            tracks,
        }
    }

    fn count(requests: &Mutex<Vec<String>>, prefix: &str) -> usize {
        requests
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    #[tokio::test]
    async fn test_create_playlist_splits_found_and_missing() {
        let (url, requests) = stub_api().await;
        let client =
            YouTubePlaylistClient::new(&url, Arc::new(StaticCredentials), Duration::from_secs(5))
                .unwrap();

        let outcome = client
            .create_playlist(request(vec![
                Track::new("Adele", "Hello"),
                Track::new("Nobody", "Unknown Song"),
                Track::new("Queen", "Bicycle Race"),
            ]))
            .await
            .unwrap();

        assert_eq!(outcome.playlist_id, "PL42");
        assert_eq!(outcome.playlist_url, playlist_url("PL42"));
        assert_eq!(
            outcome.found,
            vec![Track::new("Adele", "Hello"), Track::new("Queen", "Bicycle Race")]
        );
        assert_eq!(outcome.not_found, vec![Track::new("Nobody", "Unknown Song")]);

        assert_eq!(count(&requests, "GET /search"), 3);
        assert_eq!(count(&requests, "POST /playlists?"), 1);
        assert_eq!(count(&requests, "POST /playlistItems"), 2);
    }

    #[tokio::test]
    async fn test_no_playlist_created_when_nothing_found() {
        let (url, requests) = stub_api().await;
        let client =
            YouTubePlaylistClient::new(&url, Arc::new(StaticCredentials), Duration::from_secs(5))
                .unwrap();

        let err = client
            .create_playlist(request(vec![
                Track::new("Nobody", "First"),
                Track::new("Nobody", "Second"),
            ]))
            .await
            .unwrap_err();

        assert!(matches!(err, PlaylistError::NoTracksFound));
        assert_eq!(count(&requests, "GET /search"), 2);
        assert_eq!(count(&requests, "POST"), 0);
    }

    struct NoCredentials;

    #[async_trait]
    impl CredentialProvider for NoCredentials {
        async fn valid_credentials(&self) -> Result<OAuthCredentials, PlaylistError> {
            Err(PlaylistError::CredentialsUnavailable("none".to_string()))
        }

        async fn refresh(&self) -> Result<OAuthCredentials, PlaylistError> {
            Err(PlaylistError::RefreshFailed("none".to_string()))
        }
    }

    #[test]
    fn test_playlist_url() {
        assert_eq!(
            playlist_url("PL123"),
            "https://www.youtube.com/playlist?list=PL123"
        );
    }

    #[test]
    fn test_search_query() {
        assert_eq!(
            search_query(&Track::new("Daft Punk", "Around the World")),
            "Daft Punk Around the World"
        );
    }

    #[test]
    fn test_first_video_id_skips_channels() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"items":[{"id":{"kind":"youtube#channel","channelId":"UC1"}},
                         {"id":{"kind":"youtube#video","videoId":"dQw4w9WgXcQ"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_video_id(response).as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_empty_search() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(first_video_id(response).is_none());
    }

    #[test]
    fn test_api_url_trimming() {
        let client = YouTubePlaylistClient::new(
            "https://www.googleapis.com/youtube/v3/",
            Arc::new(NoCredentials),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.api_url(), "https://www.googleapis.com/youtube/v3");
    }

    #[tokio::test]
    async fn test_credentials_failure_propagates() {
        let client = YouTubePlaylistClient::new(
            "http://127.0.0.1:9",
            Arc::new(NoCredentials),
            Duration::from_secs(1),
        )
        .unwrap();
        let err = client
            .create_playlist(PlaylistRequest {
                title: "t".to_string(),
                description: String::new(),
                privacy: Privacy::Private,
                tracks: vec![Track::new("a", "b")],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PlaylistError::CredentialsUnavailable(_)));
    }

    #[test]
    fn test_from_config_requires_client_id() {
        let result = YouTubePlaylistClient::from_config(
            &PlaylistConfig::default(),
            std::path::PathBuf::from("/tmp/none.json"),
        );
        assert!(matches!(
            result,
            Err(PlaylistError::CredentialsUnavailable(_))
        ));
    }
}
