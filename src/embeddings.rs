//! Embedding access behind a local provider seam.
//!
//! Production runs wrap a rig [`EmbeddingModel`]; tests use the
//! deterministic mock so nothing touches the network.

use async_trait::async_trait;
use rig::embeddings::embedding::{Embedding, EmbeddingError, EmbeddingModel};

use crate::types::AssistError;

/// Batch embedding interface used by the index writer and the retriever.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Vector width produced by this provider.
    fn dimensions(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AssistError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, AssistError> {
        let texts = vec![text.to_string()];
        let mut vectors = self.embed_batch(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| AssistError::Embedding("provider returned no vector".to_string()))
    }
}

/// Adapter from any rig embedding model to [`EmbeddingProvider`].
#[derive(Clone)]
pub struct RigEmbeddingProvider<E> {
    model: E,
}

impl<E> RigEmbeddingProvider<E>
where
    E: EmbeddingModel,
{
    pub fn new(model: E) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &E {
        &self.model
    }
}

#[async_trait]
impl<E> EmbeddingProvider for RigEmbeddingProvider<E>
where
    E: EmbeddingModel + Send + Sync,
{
    fn dimensions(&self) -> usize {
        self.model.ndims()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AssistError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self
            .model
            .embed_texts(texts.to_vec())
            .await
            .map_err(|err| AssistError::Embedding(err.to_string()))?;
        Ok(embeddings
            .into_iter()
            .map(|embedding| embedding.vec.into_iter().map(|v| v as f32).collect())
            .collect())
    }
}

/// Deterministic hash-based embedding model for tests and offline runs.
///
/// Identical text always maps to the identical vector, so similarity
/// search over it is stable run to run.
#[derive(Clone, Debug)]
pub struct MockEmbeddingModel {
    ndims: usize,
}

impl MockEmbeddingModel {
    pub fn new(ndims: usize) -> Self {
        Self { ndims }
    }
}

impl Default for MockEmbeddingModel {
    fn default() -> Self {
        Self::new(8)
    }
}

impl EmbeddingModel for MockEmbeddingModel {
    const MAX_DOCUMENTS: usize = 64;

    type Client = ();

    fn make(_client: &Self::Client, _model: impl Into<String>, dims: Option<usize>) -> Self {
        Self::new(dims.unwrap_or(8))
    }

    fn ndims(&self) -> usize {
        self.ndims
    }

    fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> impl std::future::Future<Output = Result<Vec<Embedding>, EmbeddingError>> + Send {
        let ndims = self.ndims;
        let documents: Vec<String> = texts.into_iter().collect();
        async move {
            Ok(documents
                .into_iter()
                .map(|document| Embedding {
                    vec: hash_embedding(&document, ndims),
                    document,
                })
                .collect())
        }
    }
}

/// Provider-level mock mirroring the rig-level one.
#[derive(Clone, Debug, Default)]
pub struct MockEmbeddingProvider {
    model: MockEmbeddingModel,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.model.ndims()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AssistError> {
        Ok(texts
            .iter()
            .map(|text| {
                hash_embedding(text, self.model.ndims())
                    .into_iter()
                    .map(|v| v as f32)
                    .collect()
            })
            .collect())
    }
}

fn hash_embedding(text: &str, ndims: usize) -> Vec<f64> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..ndims)
        .map(|i| {
            let bits = seed.rotate_left((i * 8) as u32) ^ ((i as u64) << 24);
            (bits as f64) / u32::MAX as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let inputs = vec![
            "Hello world".to_string(),
            "Goodbye world".to_string(),
            "Hello world".to_string(),
        ];

        let first = provider.embed_batch(&inputs).await.unwrap();
        let second = provider.embed_batch(&inputs).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0], first[2]);
        assert_ne!(first[0], first[1]);
    }

    #[tokio::test]
    async fn embed_one_returns_a_single_vector() {
        let provider = MockEmbeddingProvider::new();
        let vector = provider.embed_one("daily bookings").await.unwrap();
        assert_eq!(vector.len(), provider.dimensions());
    }
}
