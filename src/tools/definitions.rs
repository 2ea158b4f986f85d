//! Tool descriptions and the curator prompt handed to the agent runtime.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{CREATE_PLAYLIST, GET_COLLECTION_STATS, MAX_LIMIT, SEARCH_SONGS, SEARCH_SONGS_BY_ARTIST};

pub const AGENT_INSTRUCTIONS: &str = r#"You are a helpful music curation assistant with access to a large database of songs and YouTube playlist integration.

When users ask for music recommendations:
1. Use the search_songs tool to find songs matching their mood, vibe, or description
2. Present results in a friendly, organized way
3. If the user wants a playlist, use create_youtube_playlist and return the YouTube link

You can search by mood or emotion ("happy", "melancholic"), genre or style ("90s rock", "jazz"),
activities ("workout music", "study background") and themes ("cyberpunk", "rainy day").
Use search_songs_by_artist when the user names an artist exactly.

When creating playlists:
- First search for songs using search_songs
- Then call create_youtube_playlist with the found songs as a list of {"artist": ..., "song": ...} objects
- Always include the playlist link in your response and mention songs that could not be found

Always use the tools to give actual recommendations from the database. If a tool returns an error,
tell the user the song database is unavailable instead of inventing songs."#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

impl ToolDefinition {
    fn new(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

fn limit_schema() -> Value {
    json!({
        "type": "integer",
        "description": format!("Maximum number of songs to return (default 10, max {MAX_LIMIT})"),
        "minimum": 1,
        "maximum": MAX_LIMIT,
        "default": 10
    })
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            SEARCH_SONGS,
            "Search for songs by semantic similarity to a mood, vibe, theme or description.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Natural language description, e.g. \"sad breakup songs\" or \"90s cyberpunk vibes\""
                    },
                    "limit": limit_schema()
                },
                "required": ["query"]
            }),
        ),
        ToolDefinition::new(
            SEARCH_SONGS_BY_ARTIST,
            "List songs by an artist. The name must match exactly.",
            json!({
                "type": "object",
                "properties": {
                    "artist_name": { "type": "string", "description": "Exact artist name" },
                    "limit": limit_schema()
                },
                "required": ["artist_name"]
            }),
        ),
        ToolDefinition::new(
            GET_COLLECTION_STATS,
            "Get the number of songs in the collection and its status.",
            json!({ "type": "object", "properties": {} }),
        ),
        ToolDefinition::new(
            CREATE_PLAYLIST,
            "Create a YouTube playlist from songs and return its link with found and missing tracks.",
            json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "songs": {
                        "description": "Songs as a list of {artist, song} objects or a JSON string of that list",
                        "oneOf": [
                            {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "artist": { "type": "string" },
                                        "song": { "type": "string" }
                                    },
                                    "required": ["artist", "song"]
                                }
                            },
                            { "type": "string" }
                        ]
                    },
                    "description": { "type": "string" },
                    "privacy": { "type": "string", "enum": ["private", "unlisted", "public"] }
                },
                "required": ["title", "songs"]
            }),
        ),
    ]
}
