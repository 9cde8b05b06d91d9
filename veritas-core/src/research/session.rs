//! Research session state.
//!
//! A session carries everything that persists between research runs: the
//! document embedding index (so follow-up queries hit previously ingested
//! documents) and the last run's outcome (so a shell can re-synthesize
//! without re-fetching). Engines are stateless; all run-to-run state lives
//! here, explicitly.

use crate::config::ResearchConfig;
use crate::embeddings::{create_embedder, Embedder};
use crate::index::EmbeddingIndex;
use crate::types::ResearchOutcome;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub struct ResearchSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    index: Option<Arc<EmbeddingIndex>>,
    last_outcome: Option<ResearchOutcome>,
}

impl ResearchSession {
    /// Create a session with an explicit embedding backend. Pass `None` to
    /// disable document retrieval for this session.
    pub fn new(embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            index: embedder.map(|e| Arc::new(EmbeddingIndex::new(e))),
            last_outcome: None,
        }
    }

    /// Create a session from config. An unavailable embedding backend
    /// disables document retrieval with a warning; it never fails session
    /// creation.
    pub fn from_config(config: &ResearchConfig) -> Self {
        let embedder = match create_embedder(&config.embedding) {
            Ok(embedder) => Some(embedder),
            Err(e) => {
                tracing::warn!(error = %e, "document retrieval disabled for this session");
                None
            }
        };
        Self::new(embedder)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The session's document index, when an embedding backend exists.
    pub fn index(&self) -> Option<&EmbeddingIndex> {
        self.index.as_deref()
    }

    /// Outcome of the most recent run, if any.
    pub fn last_outcome(&self) -> Option<&ResearchOutcome> {
        self.last_outcome.as_ref()
    }

    pub(crate) fn remember_outcome(&mut self, outcome: ResearchOutcome) {
        self.last_outcome = Some(outcome);
    }

    /// Drop indexed documents and the remembered outcome. The session id
    /// and embedding backend survive.
    pub async fn reset(&mut self) {
        if let Some(index) = &self.index {
            index.clear().await;
        }
        self.last_outcome = None;
    }
}
