//! Embedding backends for document retrieval.
//!
//! Two backends behind one trait: a deterministic local hash-based embedder
//! that needs no network or API key, and an OpenAI-compatible HTTP embedder.
//! The local backend is the default so document indexing works out of the
//! box; its vectors are not semantically meaningful the way a trained model's
//! are, but they are stable, normalized, and good enough for term-overlap
//! retrieval.

use crate::error::IndexError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default dimensionality for the local hash embedder.
const LOCAL_DIMENSIONS: usize = 128;

/// An embedding backend.
#[async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Embed a single text into a fixed-size vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError>;

    /// Embed a batch of texts. The default loops over [`Embedder::embed`];
    /// HTTP backends override it to batch the request.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Output vector dimensionality.
    fn dimensions(&self) -> usize;

    /// Name used in logs.
    fn provider_name(&self) -> &str;
}

/// Embedding backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend selector: "local" or "openai".
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model name for HTTP backends.
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key for HTTP backends.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Base URL for HTTP backends.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Vector dimensionality. 0 means "use the backend's default".
    #[serde(default)]
    pub dimensions: usize,
}

fn default_provider() -> String {
    "local".into()
}

fn default_model() -> String {
    "text-embedding-3-small".into()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            dimensions: 0,
        }
    }
}

/// Deterministic local embedder: hashed term frequencies, L2-normalized.
///
/// Tokenizes on non-alphanumeric boundaries, lowercases, buckets each token
/// by a djb2 hash, then normalizes the count vector. Identical input always
/// produces identical output.
#[derive(Debug)]
pub struct LocalEmbedder {
    dimensions: usize,
}

impl LocalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: if dimensions == 0 {
                LOCAL_DIMENSIONS
            } else {
                dimensions
            },
        }
    }

    fn hash_token(token: &str) -> u64 {
        let mut hash: u64 = 5381;
        for byte in token.bytes() {
            hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
        }
        hash
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let lowered = token.to_lowercase();
            let bucket = (Self::hash_token(&lowered) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for LocalEmbedder {
    fn default() -> Self {
        Self::new(LOCAL_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "local"
    }
}

/// OpenAI-compatible HTTP embedder (`POST {base_url}/embeddings`).
#[derive(Debug)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, IndexError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            IndexError::EmbedderUnavailable {
                message: format!("environment variable {} is not set", config.api_key_env),
            }
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            dimensions: if config.dimensions == 0 {
                1536
            } else {
                config.dimensions
            },
        })
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: inputs,
            })
            .send()
            .await
            .map_err(|e| IndexError::Embedding {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(IndexError::Embedding {
                message: format!("embeddings endpoint returned {}", response.status()),
            });
        }

        let parsed: EmbeddingResponse =
            response.json().await.map_err(|e| IndexError::Embedding {
                message: format!("malformed embeddings response: {e}"),
            })?;

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| IndexError::Embedding {
            message: "embeddings response contained no vectors".into(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.request(texts).await?;
        if vectors.len() != texts.len() {
            return Err(IndexError::Embedding {
                message: format!(
                    "embeddings response had {} vectors for {} inputs",
                    vectors.len(),
                    texts.len()
                ),
            });
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

/// Construct the embedding backend selected by `config`.
///
/// Failure here disables document retrieval for the run; it never aborts
/// research over the other sources.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, IndexError> {
    match config.provider.as_str() {
        "local" => Ok(Arc::new(LocalEmbedder::new(config.dimensions))),
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        other => Err(IndexError::EmbedderUnavailable {
            message: format!("unknown embedding provider '{other}'"),
        }),
    }
}
