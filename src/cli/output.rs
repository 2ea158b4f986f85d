use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::{OutputFormat, SearchResults};
use crate::services::IngestStats;
use crate::tools::{PlaylistSummary, ToolDefinition, ToolResponse};

pub trait Formatter {
    fn format_search_results(&self, results: &SearchResults) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_ingest_stats(&self, stats: &IngestStats) -> String;
    fn format_playlist(&self, playlist: &PlaylistSummary) -> String;
    fn format_tools(&self, tools: &[ToolDefinition]) -> String;
    fn format_tool_response(&self, response: &ToolResponse) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub server_running: bool,
    pub server_idle_secs: Option<u64>,
    pub embedding_model: String,
    pub model_dir: Option<String>,
    pub model_present: bool,
    pub vector_store_driver: String,
    pub vector_store_url: String,
    pub vector_store_connected: bool,
    pub collection: String,
    /// None when the collection does not exist yet.
    pub points: Option<u64>,
    pub playlist_configured: bool,
}

fn mark(ok: bool) -> &'static str {
    if ok { "✓" } else { "✗" }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("No songs found for: {}\n", results.query);
        }

        let mut output = String::new();
        writeln!(output, "Songs for: \"{}\"", results.query).unwrap();
        writeln!(
            output,
            "Found {} songs in {}ms\n",
            results.len(),
            results.duration_ms
        )
        .unwrap();

        for (i, hit) in results.results.iter().enumerate() {
            match hit.score {
                Some(score) => {
                    writeln!(output, "{}. {} - {} [Score: {:.3}]", i + 1, hit.artist, hit.song, score)
                        .unwrap()
                }
                None => writeln!(output, "{}. {} - {}", i + 1, hit.artist, hit.song).unwrap(),
            }
            if !hit.link.is_empty() {
                writeln!(output, "   Link: {}", hit.link).unwrap();
            }
            writeln!(output, "   ---").unwrap();
            for line in hit.preview.lines().filter(|l| !l.trim().is_empty()).take(4) {
                writeln!(output, "   {}", line.trim()).unwrap();
            }
            writeln!(output).unwrap();
        }

        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        let server = if status.server_running {
            "[RUNNING]"
        } else {
            "[STOPPED]"
        };
        writeln!(output, "Tool Server:   {}", server).unwrap();
        if let Some(idle) = status.server_idle_secs {
            writeln!(output, "  Idle:        {}s", idle).unwrap();
        }
        writeln!(output).unwrap();

        writeln!(
            output,
            "Embedding:     {} {}",
            status.embedding_model,
            mark(status.model_present)
        )
        .unwrap();
        if let Some(ref dir) = status.model_dir {
            writeln!(output, "  Model dir:   {}", dir).unwrap();
        }
        writeln!(output).unwrap();

        let vector_status = if status.vector_store_connected {
            "[CONNECTED]"
        } else {
            "[DISCONNECTED]"
        };
        writeln!(
            output,
            "Vector Store:  {} ({})",
            status.vector_store_driver, vector_status
        )
        .unwrap();
        writeln!(output, "  URL:         {}", status.vector_store_url).unwrap();
        writeln!(output, "  Collection:  {}", status.collection).unwrap();
        if status.vector_store_connected {
            match status.points {
                Some(points) => writeln!(output, "  Songs:       {}", points).unwrap(),
                None => writeln!(output, "  Songs:       (collection missing)").unwrap(),
            }
        }
        writeln!(output).unwrap();

        writeln!(
            output,
            "Playlists:     {}",
            if status.playlist_configured {
                "configured"
            } else {
                "not configured"
            }
        )
        .unwrap();

        output
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        let mut output = String::new();
        writeln!(output, "Ingestion Complete").unwrap();
        writeln!(output, "------------------").unwrap();
        writeln!(output, "Songs stored:    {}", stats.songs_upserted).unwrap();
        writeln!(output, "Batches:         {}", stats.batches).unwrap();
        writeln!(output, "Records skipped: {}", stats.records_skipped).unwrap();
        writeln!(output, "Duration:        {}ms", stats.duration_ms).unwrap();
        output
    }

    fn format_playlist(&self, playlist: &PlaylistSummary) -> String {
        let mut output = String::new();
        writeln!(output, "Playlist: {}", playlist.playlist_url).unwrap();
        writeln!(output, "Added {} songs", playlist.found.len()).unwrap();
        for track in &playlist.found {
            writeln!(output, "  ✓ {} - {}", track.artist, track.song).unwrap();
        }
        if !playlist.not_found.is_empty() {
            writeln!(output, "Not found: {}", playlist.not_found.len()).unwrap();
            for track in &playlist.not_found {
                writeln!(output, "  ✗ {} - {}", track.artist, track.song).unwrap();
            }
        }
        output
    }

    fn format_tools(&self, tools: &[ToolDefinition]) -> String {
        let mut output = String::new();
        writeln!(output, "Available Tools").unwrap();
        writeln!(output, "---------------").unwrap();
        for tool in tools {
            writeln!(output, "  {} - {}", tool.name, tool.description).unwrap();
        }
        output
    }

    fn format_tool_response(&self, response: &ToolResponse) -> String {
        match (&response.data, &response.error) {
            (_, Some(error)) => format!("Error ({:?}): {}\n", error.kind, error.message),
            (Some(data), None) => {
                let mut text = serde_json::to_string_pretty(data).unwrap_or_default();
                text.push('\n');
                text
            }
            (None, None) => "ok\n".to_string(),
        }
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &impl Serialize) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

impl Formatter for JsonFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        self.render(results)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let json = serde_json::json!({
            "server": {
                "running": status.server_running,
                "idle_secs": status.server_idle_secs,
            },
            "embedding": {
                "model": status.embedding_model,
                "model_dir": status.model_dir,
                "present": status.model_present,
            },
            "vector_store": {
                "driver": status.vector_store_driver,
                "url": status.vector_store_url,
                "connected": status.vector_store_connected,
                "collection": status.collection,
                "points": status.points,
            },
            "playlist": {
                "configured": status.playlist_configured,
            }
        });
        self.render(&json)
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        self.render(stats)
    }

    fn format_playlist(&self, playlist: &PlaylistSummary) -> String {
        self.render(playlist)
    }

    fn format_tools(&self, tools: &[ToolDefinition]) -> String {
        self.render(&serde_json::json!({ "tools": tools }))
    }

    fn format_tool_response(&self, response: &ToolResponse) -> String {
        self.render(response)
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("## No songs found\n\nQuery: `{}`\n", results.query);
        }

        let mut output = String::new();
        writeln!(output, "## Songs\n").unwrap();
        writeln!(output, "**Query:** `{}`\n", results.query).unwrap();

        let scored = results.results.iter().any(|h| h.score.is_some());
        if scored {
            writeln!(output, "| # | Artist | Song | Score |").unwrap();
            writeln!(output, "|---|--------|------|-------|").unwrap();
        } else {
            writeln!(output, "| # | Artist | Song |").unwrap();
            writeln!(output, "|---|--------|------|").unwrap();
        }
        for (i, hit) in results.results.iter().enumerate() {
            match hit.score {
                Some(score) if scored => writeln!(
                    output,
                    "| {} | {} | {} | {:.3} |",
                    i + 1,
                    hit.artist,
                    hit.song,
                    score
                )
                .unwrap(),
                _ => writeln!(output, "| {} | {} | {} |", i + 1, hit.artist, hit.song).unwrap(),
            }
        }

        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "## Status\n").unwrap();

        let server = if status.server_running { "✅" } else { "❌" };
        writeln!(output, "### Tool Server {}\n", server).unwrap();

        let model = if status.model_present { "✅" } else { "❌" };
        writeln!(output, "### Embedding {}\n", model).unwrap();
        writeln!(output, "- **Model:** {}", status.embedding_model).unwrap();
        if let Some(ref dir) = status.model_dir {
            writeln!(output, "- **Directory:** `{}`", dir).unwrap();
        }
        writeln!(output).unwrap();

        let vector_status = if status.vector_store_connected {
            "✅"
        } else {
            "❌"
        };
        writeln!(
            output,
            "### Vector Store ({}) {}\n",
            status.vector_store_driver, vector_status
        )
        .unwrap();
        writeln!(output, "- **URL:** `{}`", status.vector_store_url).unwrap();
        writeln!(output, "- **Collection:** {}", status.collection).unwrap();
        if let Some(points) = status.points {
            writeln!(output, "- **Songs:** {}", points).unwrap();
        }

        output
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        let mut output = String::new();
        writeln!(output, "## Ingestion Complete\n").unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(output, "| Songs stored | {} |", stats.songs_upserted).unwrap();
        writeln!(output, "| Batches | {} |", stats.batches).unwrap();
        writeln!(output, "| Records skipped | {} |", stats.records_skipped).unwrap();
        writeln!(output, "| Duration | {}ms |", stats.duration_ms).unwrap();
        output
    }

    fn format_playlist(&self, playlist: &PlaylistSummary) -> String {
        let mut output = String::new();
        writeln!(output, "## Playlist\n").unwrap();
        writeln!(output, "[Open on YouTube]({})\n", playlist.playlist_url).unwrap();
        for track in &playlist.found {
            writeln!(output, "- ✅ {} - {}", track.artist, track.song).unwrap();
        }
        for track in &playlist.not_found {
            writeln!(output, "- ❌ {} - {}", track.artist, track.song).unwrap();
        }
        output
    }

    fn format_tools(&self, tools: &[ToolDefinition]) -> String {
        let mut output = String::new();
        writeln!(output, "## Tools\n").unwrap();
        writeln!(output, "| Tool | Description |").unwrap();
        writeln!(output, "|------|-------------|").unwrap();
        for tool in tools {
            writeln!(output, "| `{}` | {} |", tool.name, tool.description).unwrap();
        }
        output
    }

    fn format_tool_response(&self, response: &ToolResponse) -> String {
        let body = serde_json::to_string_pretty(response).unwrap_or_default();
        format!("```json\n{}\n```\n", body)
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SongHit;
    use crate::services::playlist::Track;

    fn results() -> SearchResults {
        SearchResults::new(
            "rainy day".to_string(),
            vec![SongHit {
                artist: "Adele".to_string(),
                song: "Hello".to_string(),
                link: "/a/adele/hello".to_string(),
                preview: "Hello, it's me\nI was wondering".to_string(),
                score: Some(0.8123),
            }],
            12,
        )
    }

    #[test]
    fn test_text_search_results() {
        let out = TextFormatter.format_search_results(&results());
        assert!(out.contains("1. Adele - Hello [Score: 0.812]"));
        assert!(out.contains("   Hello, it's me"));
    }

    #[test]
    fn test_empty_results() {
        let empty = SearchResults::new("nothing".to_string(), Vec::new(), 0);
        assert_eq!(
            TextFormatter.format_search_results(&empty),
            "No songs found for: nothing\n"
        );
    }

    #[test]
    fn test_json_search_results_parse_back() {
        let out = JsonFormatter::new(false).format_search_results(&results());
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["results"][0]["artist"], "Adele");
    }

    #[test]
    fn test_markdown_playlist() {
        let playlist = PlaylistSummary {
            playlist_url: "https://www.youtube.com/playlist?list=PL1".to_string(),
            found: vec![Track::new("ABBA", "SOS")],
            not_found: vec![Track::new("Nobody", "Nothing")],
        };
        let out = MarkdownFormatter.format_playlist(&playlist);
        assert!(out.contains("(https://www.youtube.com/playlist?list=PL1)"));
        assert!(out.contains("- ❌ Nobody - Nothing"));
    }

    #[test]
    fn test_ingest_stats_text() {
        let stats = IngestStats {
            batches: 3,
            songs_upserted: 250,
            records_skipped: 2,
            duration_ms: 900,
        };
        let out = TextFormatter.format_ingest_stats(&stats);
        assert!(out.contains("Songs stored:    250"));
        assert!(out.contains("Records skipped: 2"));
    }
}
