//! In-memory embedding index over document chunks.
//!
//! Brute-force cosine k-NN over parallel vectors. The index holds every
//! chunk's vector and metadata side by side, guarded by one `RwLock`, so
//! queries are read-only and can never observe a half-appended state.
//!
//! Query failures (an unreachable embedding backend, mid-run) degrade to an
//! empty result with a warning log rather than aborting the research run.

use crate::chunker::Chunk;
use crate::embeddings::Embedder;
use crate::error::IndexError;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A chunk returned from a similarity query, with its cosine score.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Index lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStatus {
    /// False until the first successful build or append.
    pub initialized: bool,
    /// Number of chunks currently indexed.
    pub chunk_count: usize,
}

struct IndexState {
    vectors: Vec<Vec<f32>>,
    chunks: Vec<Chunk>,
}

/// Embedding index over document chunks.
pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    state: RwLock<Option<IndexState>>,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            state: RwLock::new(None),
        }
    }

    /// Build the index from scratch, replacing any existing content.
    ///
    /// Empty input clears the index back to uninitialized. Returns the
    /// number of chunks indexed.
    pub async fn build(&self, chunks: Vec<Chunk>) -> Result<usize, IndexError> {
        if chunks.is_empty() {
            *self.state.write().await = None;
            return Ok(0);
        }

        let vectors = self.embed_chunks(&chunks).await?;
        let count = chunks.len();
        *self.state.write().await = Some(IndexState { vectors, chunks });
        tracing::debug!(chunks = count, "embedding index built");
        Ok(count)
    }

    /// Append chunks to the index, building it if it does not exist yet.
    ///
    /// Returns the total chunk count after the append. The new state only
    /// becomes visible once both vectors and chunks are in place.
    pub async fn append(&self, chunks: Vec<Chunk>) -> Result<usize, IndexError> {
        if chunks.is_empty() {
            return Ok(self.status().await.chunk_count);
        }

        let vectors = self.embed_chunks(&chunks).await?;

        let mut guard = self.state.write().await;
        match guard.as_mut() {
            Some(state) => {
                state.vectors.extend(vectors);
                state.chunks.extend(chunks);
                Ok(state.chunks.len())
            }
            None => {
                let count = chunks.len();
                *guard = Some(IndexState { vectors, chunks });
                Ok(count)
            }
        }
    }

    /// Retrieve the `k` chunks most similar to `text`, best first.
    ///
    /// Returns an empty list for blank queries, `k == 0`, an uninitialized
    /// index, or an embedding failure. Never mutates the index.
    pub async fn query(&self, text: &str, k: usize) -> Vec<RetrievedChunk> {
        if text.trim().is_empty() || k == 0 {
            return Vec::new();
        }

        let query_vector = match self.embedder.embed(text).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed, returning no chunks");
                return Vec::new();
            }
        };

        let guard = self.state.read().await;
        let Some(state) = guard.as_ref() else {
            return Vec::new();
        };

        let mut scored: Vec<RetrievedChunk> = state
            .vectors
            .iter()
            .zip(state.chunks.iter())
            .map(|(vector, chunk)| RetrievedChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(&query_vector, vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        scored
    }

    /// Current lifecycle status.
    pub async fn status(&self) -> IndexStatus {
        let guard = self.state.read().await;
        match guard.as_ref() {
            Some(state) => IndexStatus {
                initialized: true,
                chunk_count: state.chunks.len(),
            },
            None => IndexStatus {
                initialized: false,
                chunk_count: 0,
            },
        }
    }

    /// Drop all indexed content.
    pub async fn clear(&self) {
        *self.state.write().await = None;
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, IndexError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(IndexError::Inconsistent {
                message: format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    chunks.len()
                ),
            });
        }
        Ok(vectors)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
