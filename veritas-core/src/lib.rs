//! Veritas core: multi-source research with document-grounded retrieval.
//!
//! The pipeline gathers evidence from pluggable sources (web search,
//! literature databases, encyclopedias, preprint servers) and from an
//! in-memory embedding index over user-ingested documents, then runs a
//! two-stage synthesis (per-category summaries, then one balanced report).
//! When the language model is unavailable the pipeline degrades to a raw
//! evidence listing instead of failing.
//!
//! Entry points: build a [`SourceRegistry`], an [`LlmClient`], and a
//! [`ResearchEngine`]; sessions carry per-conversation state.

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extract;
pub mod index;
pub mod llm;
pub mod research;
pub mod types;

pub use chunker::{Chunk, Chunker, ChunkerConfig, PageRange};
pub use config::{load_config, ResearchConfig, SourceBudgets, SourcesConfig, TimeoutsConfig};
pub use embeddings::{create_embedder, Embedder, EmbeddingConfig, LocalEmbedder, OpenAiEmbedder};
pub use error::{
    ConfigError, ExtractError, IndexError, LlmError, ProviderError, Result, VeritasError,
};
pub use extract::{DocumentExtractor, ExtractedText, FallbackPolicy, PlainTextExtractor};
pub use index::{EmbeddingIndex, IndexStatus, RetrievedChunk};
pub use llm::{LlmClient, LlmConfig, MockLlmClient, OpenAiCompatibleClient};
pub use research::{
    Aggregator, ResearchEngine, ResearchSession, SourceProvider, SourceRegistry, Synthesizer,
};
pub use types::{
    categories, category_display_name, total_records, EvidenceRecord, GroupedRecords,
    NoOpProgress, ProgressSink, RecordingProgress, ResearchOutcome,
};
