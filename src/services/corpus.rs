//! Song corpus reader. Accepts JSON Lines or a single JSON array.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CorpusError;
use crate::models::{CorpusRecord, SongRecord};

/// Counters collected while reading a corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    /// Records that produced a song.
    pub valid: usize,
    /// Parsed records missing artist, song or text.
    pub incomplete: usize,
    /// Lines or array elements that were not a JSON object.
    pub malformed: usize,
}

impl CorpusStats {
    pub fn skipped(&self) -> usize {
        self.incomplete + self.malformed
    }
}

enum Source<R> {
    Lines {
        reader: R,
        pending: Option<Vec<u8>>,
        line_no: usize,
    },
    Array(std::vec::IntoIter<serde_json::Value>),
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Lazy iterator over the valid songs of a corpus.
///
/// Read errors end iteration early; call [`CorpusReader::finish`] to surface
/// them together with the final counters.
pub struct CorpusReader<R> {
    source: Source<R>,
    stats: CorpusStats,
    limit: Option<usize>,
    error: Option<CorpusError>,
}

/// Open a corpus file, or stdin when `path` is `-`.
pub fn open(path: &Path) -> Result<CorpusReader<Box<dyn BufRead + Send>>, CorpusError> {
    let reader: Box<dyn BufRead + Send> = if path == Path::new("-") {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(path)?))
    };
    read_records(reader)
}

/// Start reading records. The format is detected from the first non-blank
/// character: `[` means a JSON array, anything else JSON Lines.
pub fn read_records<R: BufRead>(mut reader: R) -> Result<CorpusReader<R>, CorpusError> {
    let mut line_no = 0;
    let mut first = Vec::new();
    loop {
        first.clear();
        if reader.read_until(b'\n', &mut first)? == 0 {
            break;
        }
        line_no += 1;
        if !is_blank(&first) {
            break;
        }
    }

    let starts_array = first
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'[');

    let source = if starts_array {
        reader.read_to_end(&mut first)?;
        let values: Vec<serde_json::Value> = serde_json::from_slice(&first)?;
        debug!(elements = values.len(), "reading corpus as JSON array");
        Source::Array(values.into_iter())
    } else {
        debug!("reading corpus as JSON lines");
        Source::Lines {
            reader,
            pending: (!is_blank(&first)).then_some(first),
            line_no,
        }
    };

    Ok(CorpusReader {
        source,
        stats: CorpusStats::default(),
        limit: None,
        error: None,
    })
}

impl<R: BufRead> CorpusReader<R> {
    /// Stop after `limit` valid songs.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn stats(&self) -> CorpusStats {
        self.stats
    }

    /// Final counters, or the read error that cut the corpus short.
    pub fn finish(self) -> Result<CorpusStats, CorpusError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.stats),
        }
    }

    fn accept(&mut self, record: CorpusRecord) -> Option<SongRecord> {
        match record.into_song() {
            Some(song) => {
                self.stats.valid += 1;
                Some(song)
            }
            None => {
                self.stats.incomplete += 1;
                None
            }
        }
    }

    fn next_raw(&mut self) -> Option<Result<CorpusRecord, String>> {
        match &mut self.source {
            Source::Array(values) => values
                .next()
                .map(|v| serde_json::from_value(v).map_err(|e| e.to_string())),
            Source::Lines {
                reader,
                pending,
                line_no,
            } => loop {
                let line = match pending.take() {
                    Some(line) => line,
                    None => {
                        let mut buf = Vec::new();
                        match reader.read_until(b'\n', &mut buf) {
                            Ok(0) => return None,
                            Ok(_) => {
                                *line_no += 1;
                                buf
                            }
                            Err(e) => {
                                self.error = Some(CorpusError::IoError(e));
                                return None;
                            }
                        }
                    }
                };
                if is_blank(&line) {
                    continue;
                }
                let line = match String::from_utf8(line) {
                    Ok(line) => line,
                    Err(e) => return Some(Err(format!("line {}: {}", line_no, e))),
                };
                return Some(
                    serde_json::from_str(line.trim())
                        .map_err(|e| format!("line {}: {}", line_no, e)),
                );
            },
        }
    }
}

impl<R: BufRead> Iterator for CorpusReader<R> {
    type Item = SongRecord;

    fn next(&mut self) -> Option<SongRecord> {
        if self.limit.is_some_and(|limit| self.stats.valid >= limit) {
            return None;
        }
        loop {
            match self.next_raw()? {
                Ok(record) => {
                    if let Some(song) = self.accept(record) {
                        return Some(song);
                    }
                }
                Err(reason) => {
                    warn!(%reason, "skipping malformed corpus record");
                    self.stats.malformed += 1;
                }
            }
        }
    }
}
