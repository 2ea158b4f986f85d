//! Song records as read from a corpus and as stored in the vector store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::{is_present, truncate_chars};

/// Characters of lyrics included in the embedded text.
pub const EMBED_LYRICS_CHARS: usize = 500;

/// Characters of lyrics kept in the stored payload.
pub const PREVIEW_CHARS: usize = 200;

/// Raw corpus row. Any field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusRecord {
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl CorpusRecord {
    /// Convert into a [`SongRecord`], or `None` when artist, song or text is missing.
    pub fn into_song(self) -> Option<SongRecord> {
        if !is_present(self.artist.as_deref())
            || !is_present(self.song.as_deref())
            || !is_present(self.text.as_deref())
        {
            return None;
        }
        Some(SongRecord {
            artist: self.artist?,
            title: self.song?,
            lyrics: self.text?,
            link: self.link.unwrap_or_default(),
        })
    }
}

/// A validated song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecord {
    pub artist: String,
    pub title: String,
    pub lyrics: String,
    pub link: String,
}

impl SongRecord {
    pub fn new(
        artist: impl Into<String>,
        title: impl Into<String>,
        lyrics: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            lyrics: lyrics.into(),
            link: link.into(),
        }
    }

    /// Descriptive text handed to the embedder.
    pub fn embedding_text(&self) -> String {
        format!(
            "Artist: {} Song: {} Lyrics: {}",
            self.artist,
            self.title,
            truncate_chars(&self.lyrics, EMBED_LYRICS_CHARS)
        )
    }

    pub fn payload(&self) -> SongPayload {
        SongPayload {
            artist: self.artist.clone(),
            song: self.title.clone(),
            link: self.link.clone(),
            text_preview: truncate_chars(&self.lyrics, PREVIEW_CHARS).to_string(),
        }
    }
}

/// Metadata stored alongside each vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongPayload {
    pub artist: String,
    pub song: String,
    pub link: String,
    pub text_preview: String,
}

impl SongPayload {
    pub const ARTIST: &'static str = "artist";
    pub const SONG: &'static str = "song";
    pub const LINK: &'static str = "link";
    pub const TEXT_PREVIEW: &'static str = "text_preview";

    /// Look up a payload field by its stored key.
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            Self::ARTIST => Some(&self.artist),
            Self::SONG => Some(&self.song),
            Self::LINK => Some(&self.link),
            Self::TEXT_PREVIEW => Some(&self.text_preview),
            _ => None,
        }
    }
}

/// How point ids are assigned at ingestion time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Fresh UUID v4 per point. Re-ingesting a song stores a duplicate.
    #[default]
    Random,
    /// UUID v5 over artist, song and link. Re-ingesting overwrites.
    Content,
}

impl IdStrategy {
    pub fn point_id(self, song: &SongRecord) -> Uuid {
        match self {
            IdStrategy::Random => Uuid::new_v4(),
            IdStrategy::Content => {
                let name = format!("{}:{}:{}", song.artist, song.title, song.link);
                Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
            }
        }
    }
}

impl std::str::FromStr for IdStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" => Ok(IdStrategy::Random),
            "content" => Ok(IdStrategy::Content),
            _ => Err(format!("unknown id strategy: {}", s)),
        }
    }
}

/// A vector with its id and payload, ready for upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: SongPayload,
}

impl IndexedPoint {
    pub fn new(id: Uuid, vector: Vec<f32>, payload: SongPayload) -> Self {
        Self {
            id,
            vector,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(artist: Option<&str>, song: Option<&str>, text: Option<&str>) -> CorpusRecord {
        CorpusRecord {
            artist: artist.map(String::from),
            song: song.map(String::from),
            text: text.map(String::from),
            link: None,
        }
    }

    #[test]
    fn test_into_song_requires_fields() {
        assert!(record(Some("ABBA"), Some("SOS"), Some("lyrics")).into_song().is_some());
        assert!(record(None, Some("SOS"), Some("lyrics")).into_song().is_none());
        assert!(record(Some("ABBA"), None, Some("lyrics")).into_song().is_none());
        assert!(record(Some("ABBA"), Some("SOS"), None).into_song().is_none());
        assert!(record(Some("ABBA"), Some("SOS"), Some("  ")).into_song().is_none());
    }

    #[test]
    fn test_missing_link_becomes_empty() {
        let song = record(Some("ABBA"), Some("SOS"), Some("lyrics"))
            .into_song()
            .unwrap();
        assert_eq!(song.link, "");
    }

    #[test]
    fn test_embedding_text_truncates_lyrics() {
        let song = SongRecord::new("ABBA", "SOS", "x".repeat(800), "/a/abba/sos");
        let text = song.embedding_text();
        assert!(text.starts_with("Artist: ABBA Song: SOS Lyrics: "));
        assert_eq!(
            text.len(),
            "Artist: ABBA Song: SOS Lyrics: ".len() + EMBED_LYRICS_CHARS
        );
    }

    #[test]
    fn test_payload_preview() {
        let song = SongRecord::new("ABBA", "SOS", "y".repeat(300), "/a/abba/sos");
        let payload = song.payload();
        assert_eq!(payload.text_preview.chars().count(), PREVIEW_CHARS);
        assert_eq!(payload.song, "SOS");
        assert_eq!(payload.field("artist"), Some("ABBA"));
        assert_eq!(payload.field("unknown"), None);
    }

    #[test]
    fn test_content_ids_are_stable() {
        let song = SongRecord::new("ABBA", "SOS", "lyrics", "/a/abba/sos");
        let a = IdStrategy::Content.point_id(&song);
        let b = IdStrategy::Content.point_id(&song);
        assert_eq!(a, b);

        let other = SongRecord::new("ABBA", "Waterloo", "lyrics", "/a/abba/waterloo");
        assert_ne!(a, IdStrategy::Content.point_id(&other));
    }

    #[test]
    fn test_random_ids_differ() {
        let song = SongRecord::new("ABBA", "SOS", "lyrics", "");
        assert_ne!(
            IdStrategy::Random.point_id(&song),
            IdStrategy::Random.point_id(&song)
        );
    }

    #[test]
    fn test_corpus_record_from_json() {
        let record: CorpusRecord =
            serde_json::from_str(r#"{"artist":"ABBA","song":"SOS","text":"la la"}"#).unwrap();
        assert_eq!(record.link, None);
        assert!(record.into_song().is_some());
    }
}
