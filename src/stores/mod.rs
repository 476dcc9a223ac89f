//! Vector storage for embedded chunks.
//!
//! [`VectorBackend`] abstracts the index so the writer and retriever never
//! depend on a concrete database; [`sqlite::SqliteChunkStore`] is the
//! shipped implementation (SQLite + `sqlite-vec` through `rig-sqlite`).

pub mod sqlite;

use async_trait::async_trait;

use crate::types::AssistError;

pub use sqlite::{SqliteChunkStore, StoredChunk};

/// Async CRUD surface over a chunk index.
///
/// `add_chunks` pairs each document with its precomputed embedding;
/// `search_similar` takes a query embedding and returns the closest chunks
/// with cosine similarity scores, best first.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    async fn add_chunks(&self, documents: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), AssistError>;

    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(StoredChunk, f32)>, AssistError>;

    /// Removes every chunk ingested from the given source. Returns the
    /// number of rows deleted.
    async fn delete_chunks_by_source(&self, source: &str) -> Result<usize, AssistError>;

    async fn count(&self) -> Result<usize, AssistError>;
}
