//! Top-k similarity retrieval over the chunk index.

use std::sync::Arc;

use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::stores::VectorBackend;
use crate::types::AssistError;

/// A chunk returned from the index, with its provenance and similarity.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub content: String,
    pub source: String,
    pub page_number: Option<u32>,
    pub score: f32,
}

/// Wraps the vector index as a similarity-search callable.
#[derive(Clone)]
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    backend: Arc<dyn VectorBackend>,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        backend: Arc<dyn VectorBackend>,
        top_k: usize,
    ) -> Self {
        Self {
            provider,
            backend,
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, AssistError> {
        let embedding = self.provider.embed_one(query).await?;
        let hits = self.backend.search_similar(&embedding, self.top_k).await?;
        debug!(query, hits = hits.len(), "retrieval complete");
        Ok(hits
            .into_iter()
            .map(|(chunk, score)| RetrievedChunk {
                content: chunk.content,
                source: chunk.source,
                page_number: chunk.page_number,
                score,
            })
            .collect())
    }
}
