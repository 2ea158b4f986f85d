//! Playlist side effect: turn a list of songs into a YouTube playlist.

mod credentials;
mod youtube;

pub use credentials::{CredentialProvider, FileCredentialProvider, OAuthCredentials};
pub use youtube::{YouTubePlaylistClient, playlist_url};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PlaylistError;

/// A song to look up in the video catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub artist: String,
    pub song: String,
}

impl Track {
    pub fn new(artist: impl Into<String>, song: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            song: song.into(),
        }
    }
}

/// Playlist visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Private,
    Unlisted,
    Public,
}

impl std::str::FromStr for Privacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(Privacy::Private),
            "unlisted" => Ok(Privacy::Unlisted),
            "public" => Ok(Privacy::Public),
            _ => Err(format!("unknown privacy status: {}", s)),
        }
    }
}

impl std::fmt::Display for Privacy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Privacy::Private => write!(f, "private"),
            Privacy::Unlisted => write!(f, "unlisted"),
            Privacy::Public => write!(f, "public"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub privacy: Privacy,
    pub tracks: Vec<Track>,
}

/// Result of building a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistOutcome {
    pub playlist_id: String,
    pub playlist_url: String,
    pub found: Vec<Track>,
    pub not_found: Vec<Track>,
}

/// Anything that can assemble a playlist from tracks.
#[async_trait]
pub trait PlaylistService: Send + Sync {
    async fn create_playlist(
        &self,
        request: PlaylistRequest,
    ) -> Result<PlaylistOutcome, PlaylistError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_parse() {
        assert_eq!("PUBLIC".parse::<Privacy>().unwrap(), Privacy::Public);
        assert_eq!(Privacy::default().to_string(), "private");
        assert!("secret".parse::<Privacy>().is_err());
    }

    #[test]
    fn test_request_defaults() {
        let request: PlaylistRequest = serde_json::from_str(
            r#"{"title":"Rainy day","tracks":[{"artist":"Adele","song":"Hello"}]}"#,
        )
        .unwrap();
        assert_eq!(request.privacy, Privacy::Private);
        assert_eq!(request.tracks, vec![Track::new("Adele", "Hello")]);
    }
}
