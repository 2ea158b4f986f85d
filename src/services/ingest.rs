//! Ingestion pipeline: songs in, embedded points out, one batch at a time.

use std::io::BufRead;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::batch::BatchExt;
use super::corpus::CorpusReader;
use super::embedding::Embedder;
use super::vector_store::{Distance, VectorStore};
use crate::error::IngestError;
use crate::models::{DEFAULT_BATCH_SIZE, IdStrategy, IndexedPoint, SongRecord};

/// Progress after one batch has been stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// Zero-based batch index.
    pub index: usize,
    pub size: usize,
    /// Songs stored so far, this batch included.
    pub songs_upserted: usize,
}

/// Receives a report after every stored batch.
pub trait IngestObserver {
    fn on_batch(&mut self, report: &BatchReport);
}

impl<F: FnMut(&BatchReport)> IngestObserver for F {
    fn on_batch(&mut self, report: &BatchReport) {
        self(report)
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub batches: usize,
    pub songs_upserted: usize,
    pub records_skipped: usize,
    pub duration_ms: u64,
}

pub struct Ingestor<'a> {
    embedder: &'a dyn Embedder,
    store: &'a dyn VectorStore,
    batch_size: usize,
    id_strategy: IdStrategy,
}

impl<'a> Ingestor<'a> {
    pub fn new(embedder: &'a dyn Embedder, store: &'a dyn VectorStore) -> Self {
        Self {
            embedder,
            store,
            batch_size: DEFAULT_BATCH_SIZE as usize,
            id_strategy: IdStrategy::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_id_strategy(mut self, id_strategy: IdStrategy) -> Self {
        self.id_strategy = id_strategy;
        self
    }

    /// Ingest everything a corpus reader yields. Skipped records are taken
    /// from the reader's counters once it is drained.
    pub async fn ingest_corpus<R: BufRead>(
        &self,
        mut reader: CorpusReader<R>,
        observer: &mut dyn IngestObserver,
    ) -> Result<IngestStats, IngestError> {
        let mut stats = self.ingest(reader.by_ref(), observer).await?;
        let corpus = reader.finish().map_err(|source| IngestError::Corpus {
            songs_upserted: stats.songs_upserted,
            source,
        })?;
        stats.records_skipped = corpus.skipped();
        if stats.records_skipped > 0 {
            info!(
                incomplete = corpus.incomplete,
                malformed = corpus.malformed,
                "corpus records skipped"
            );
        }
        Ok(stats)
    }

    /// Embed and store validated songs.
    ///
    /// The collection is created first if needed. Batches are stored in order;
    /// the first failure aborts the run and leaves earlier batches in place.
    pub async fn ingest<I>(
        &self,
        songs: I,
        observer: &mut dyn IngestObserver,
    ) -> Result<IngestStats, IngestError>
    where
        I: IntoIterator<Item = SongRecord>,
    {
        let start = Instant::now();
        let batches = songs
            .into_iter()
            .batches(self.batch_size)
            .ok_or(IngestError::InvalidBatchSize(self.batch_size))?;

        self.store
            .ensure_collection(self.embedder.dimension(), Distance::Cosine)
            .await
            .map_err(IngestError::Collection)?;

        let mut stats = IngestStats::default();
        for (index, batch) in batches.enumerate() {
            let size = batch.len();
            let points = self.embed_batch(index, batch)?;

            self.store.upsert(points).await.map_err(|source| {
                warn!(batch = index, error = %source, "upsert failed, aborting ingestion");
                IngestError::Upsert {
                    batch: index,
                    source,
                }
            })?;

            stats.batches += 1;
            stats.songs_upserted += size;
            debug!(batch = index, size, total = stats.songs_upserted, "batch stored");
            observer.on_batch(&BatchReport {
                index,
                size,
                songs_upserted: stats.songs_upserted,
            });
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            collection = self.store.collection(),
            batches = stats.batches,
            songs = stats.songs_upserted,
            duration_ms = stats.duration_ms,
            "ingestion complete"
        );
        Ok(stats)
    }

    fn embed_batch(
        &self,
        index: usize,
        batch: Vec<SongRecord>,
    ) -> Result<Vec<IndexedPoint>, IngestError> {
        let texts: Vec<String> = batch.iter().map(SongRecord::embedding_text).collect();
        let vectors = self.embedder.embed(&texts).map_err(|source| {
            warn!(batch = index, error = %source, "embedding failed, aborting ingestion");
            IngestError::Embedding {
                batch: index,
                source,
            }
        })?;

        if vectors.len() != batch.len() {
            return Err(IngestError::EmbeddingCount {
                expected: batch.len(),
                actual: vectors.len(),
            });
        }

        Ok(batch
            .iter()
            .zip(vectors)
            .map(|(song, vector)| {
                IndexedPoint::new(self.id_strategy.point_id(song), vector, song.payload())
            })
            .collect())
    }
}
