//! Embedding/index writer: chunk text in, vectors + rows out.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::embeddings::EmbeddingProvider;
use crate::stores::{StoredChunk, VectorBackend};
use crate::types::{AssistError, ChunkRecord};

/// Embedding batch ceiling per provider call.
const EMBED_BATCH: usize = 64;

#[derive(Debug, Default, Clone, Copy)]
pub struct IndexSummary {
    pub chunks_written: usize,
    pub sources_replaced: usize,
}

/// Writes chunk records to the vector index.
///
/// Chunk indexes are assigned per source/page in split order; every source
/// present in the batch is cleared first, so re-ingesting a document
/// replaces its previous chunks instead of stacking duplicates.
pub struct IndexWriter {
    provider: Arc<dyn EmbeddingProvider>,
    backend: Arc<dyn VectorBackend>,
}

impl IndexWriter {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, backend: Arc<dyn VectorBackend>) -> Self {
        Self { provider, backend }
    }

    pub async fn write(&self, chunks: &[ChunkRecord]) -> Result<IndexSummary, AssistError> {
        if chunks.is_empty() {
            return Ok(IndexSummary::default());
        }

        let mut sources: Vec<&str> = Vec::new();
        for chunk in chunks {
            if !sources.contains(&chunk.source.as_str()) {
                sources.push(&chunk.source);
            }
        }
        for source in &sources {
            let removed = self.backend.delete_chunks_by_source(source).await?;
            if removed > 0 {
                debug!(source, removed, "cleared stale chunks before rewrite");
            }
        }

        let mut counters: HashMap<(String, Option<u32>), usize> = HashMap::new();
        let mut documents = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let key = (chunk.source.clone(), chunk.page_number);
            let index = counters.entry(key).or_insert(0);
            documents.push(StoredChunk::from_record(chunk, *index));
            *index += 1;
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.chunk_text.clone()).collect();
        let mut rows = Vec::with_capacity(documents.len());
        for (batch, docs) in texts.chunks(EMBED_BATCH).zip(documents.chunks(EMBED_BATCH)) {
            let vectors = self.provider.embed_batch(batch).await?;
            if vectors.len() != docs.len() {
                return Err(AssistError::Embedding(format!(
                    "provider returned {} vectors for {} texts",
                    vectors.len(),
                    docs.len()
                )));
            }
            rows.extend(docs.iter().cloned().zip(vectors));
        }

        let written = rows.len();
        self.backend.add_chunks(rows).await?;
        info!(written, sources = sources.len(), "index write complete");

        Ok(IndexSummary {
            chunks_written: written,
            sources_replaced: sources.len(),
        })
    }
}
