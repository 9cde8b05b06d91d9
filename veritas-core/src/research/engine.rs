//! The research engine: the orchestration entry point tying gathering,
//! document retrieval, synthesis, and report assembly together.
//!
//! The engine itself is stateless; everything that persists between runs
//! lives in a [`ResearchSession`]. One engine can drive many sessions.

use crate::config::ResearchConfig;
use crate::error::{ConfigError, IndexError, Result, VeritasError};
use crate::extract::DocumentExtractor;
use crate::chunker::Chunker;
use crate::llm::LlmClient;
use crate::research::aggregator::Aggregator;
use crate::research::registry::SourceRegistry;
use crate::research::report::assemble_report;
use crate::research::session::ResearchSession;
use crate::research::synthesis::Synthesizer;
use crate::types::{GroupedRecords, ProgressSink, ResearchOutcome};
use std::collections::HashSet;
use std::sync::Arc;

pub struct ResearchEngine {
    config: ResearchConfig,
    registry: SourceRegistry,
    llm: Arc<dyn LlmClient>,
    chunker: Chunker,
}

impl ResearchEngine {
    pub fn new(config: ResearchConfig, registry: SourceRegistry, llm: Arc<dyn LlmClient>) -> Self {
        let chunker = Chunker::new(config.chunking.clone());
        Self {
            config,
            registry,
            llm,
            chunker,
        }
    }

    /// Start a new session using this engine's embedding configuration.
    pub fn start_session(&self) -> ResearchSession {
        ResearchSession::from_config(&self.config)
    }

    /// Display names of the registered evidence sources, in consultation
    /// order.
    pub fn available_sources(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Extract, chunk, and index a document into the session.
    ///
    /// Runs the extraction fallback policy when a secondary extractor is
    /// supplied. Returns the number of chunks added; zero means the
    /// document produced no indexable text or could not be read at all.
    /// An unreadable document is logged as a warning, never an error: one
    /// corrupted upload must not abort the session.
    pub async fn ingest_document(
        &self,
        session: &ResearchSession,
        name: &str,
        bytes: &[u8],
        label: &str,
        extractor: &dyn DocumentExtractor,
        fallback: Option<&dyn DocumentExtractor>,
    ) -> Result<usize> {
        let index = session.index().ok_or(VeritasError::Index(
            IndexError::EmbedderUnavailable {
                message: "session has no embedding backend".into(),
            },
        ))?;

        let direct = match extractor.extract(name, bytes) {
            Ok(extracted) => extracted,
            Err(e) => {
                tracing::warn!(document = name, error = %e, "extraction failed, skipping document");
                return Ok(0);
            }
        };
        let (extracted, used_fallback) =
            self.config.extraction.resolve(name, bytes, direct, fallback);
        if let Some(extractor_name) = used_fallback {
            tracing::info!(document = name, extractor = extractor_name, "used fallback extraction");
        }

        let chunks = self
            .chunker
            .chunk(&extracted.text, name, label, &extracted.pages);
        if chunks.is_empty() {
            tracing::warn!(document = name, "document produced no indexable text");
            return Ok(0);
        }

        let added = chunks.len();
        index.append(chunks).await?;
        tracing::info!(document = name, chunks = added, "document indexed");
        Ok(added)
    }

    /// Run the full research pipeline for `query` and remember the outcome
    /// in the session.
    pub async fn conduct(
        &self,
        session: &mut ResearchSession,
        query: &str,
        label_filter: Option<&HashSet<String>>,
        progress: &dyn ProgressSink,
    ) -> Result<ResearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(VeritasError::Config(ConfigError::Invalid {
                message: "research query is empty".into(),
            }));
        }

        tracing::info!(session = %session.id(), query, "research run started");
        let aggregator = Aggregator::new(self.config.budgets.clone(), &self.config.timeouts);
        let (grouped, mut warnings) = aggregator
            .gather(query, &self.registry, session.index(), label_filter, progress)
            .await;

        let synthesizer = Synthesizer::new(self.llm.clone());
        let synthesis = synthesizer.synthesize(query, &grouped, progress).await;
        warnings.extend(synthesis.warnings.iter().cloned());

        let report = assemble_report(query, &grouped, &synthesis, &warnings);
        let outcome = ResearchOutcome {
            report,
            grouped_records: grouped,
            degraded: synthesis.degraded,
            warnings,
        };
        session.remember_outcome(outcome.clone());
        tracing::info!(session = %session.id(), degraded = outcome.degraded, "research run finished");
        Ok(outcome)
    }

    /// Re-run synthesis over already-gathered records without touching any
    /// provider or the document index.
    ///
    /// The shell typically passes a filtered copy of the previous outcome's
    /// records after the user deselected some of them.
    pub async fn regenerate(
        &self,
        session: &mut ResearchSession,
        query: &str,
        grouped: GroupedRecords,
        progress: &dyn ProgressSink,
    ) -> Result<ResearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(VeritasError::Config(ConfigError::Invalid {
                message: "research query is empty".into(),
            }));
        }

        tracing::info!(session = %session.id(), query, "regenerating report");
        let synthesizer = Synthesizer::new(self.llm.clone());
        let synthesis = synthesizer.synthesize(query, &grouped, progress).await;
        let warnings = synthesis.warnings.clone();

        let report = assemble_report(query, &grouped, &synthesis, &warnings);
        let outcome = ResearchOutcome {
            report,
            grouped_records: grouped,
            degraded: synthesis.degraded,
            warnings,
        };
        session.remember_outcome(outcome.clone());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::extract::PlainTextExtractor;
    use crate::llm::MockLlmClient;
    use crate::research::registry::SourceProvider;
    use crate::types::{categories, NoOpProgress};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SourceProvider for CountingProvider {
        fn name(&self) -> &str {
            "Counting"
        }

        fn category(&self) -> &str {
            categories::WEB
        }

        async fn fetch(
            &self,
            _query: &str,
            _budget: usize,
        ) -> std::result::Result<Vec<serde_json::Value>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![serde_json::json!({ "title": "t", "content": "c" })])
        }
    }

    fn engine_with_counter() -> (ResearchEngine, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = SourceRegistry::new().with(Arc::new(CountingProvider {
            calls: calls.clone(),
        }));
        let engine = ResearchEngine::new(
            ResearchConfig::default(),
            registry,
            Arc::new(MockLlmClient::new("synthesized report body")),
        );
        (engine, calls)
    }

    #[tokio::test]
    async fn test_conduct_produces_outcome_and_remembers_it() {
        let (engine, _) = engine_with_counter();
        let mut session = engine.start_session();
        let outcome = engine
            .conduct(&mut session, "test topic", None, &NoOpProgress)
            .await
            .unwrap();
        assert!(!outcome.degraded);
        assert!(outcome.report.contains("synthesized report body"));
        assert_eq!(outcome.grouped_records[categories::WEB].len(), 1);
        assert_eq!(
            session.last_outcome().unwrap().report,
            outcome.report
        );
    }

    #[tokio::test]
    async fn test_conduct_rejects_empty_query() {
        let (engine, calls) = engine_with_counter();
        let mut session = engine.start_session();
        let err = engine
            .conduct(&mut session, "   ", None, &NoOpProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, VeritasError::Config(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_regenerate_never_refetches() {
        let (engine, calls) = engine_with_counter();
        let mut session = engine.start_session();
        let outcome = engine
            .conduct(&mut session, "topic", None, &NoOpProgress)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let regenerated = engine
            .regenerate(&mut session, "topic", outcome.grouped_records, &NoOpProgress)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(regenerated.report.contains("synthesized report body"));
    }

    #[tokio::test]
    async fn test_ingest_document_indexes_chunks() {
        let (engine, _) = engine_with_counter();
        let session = engine.start_session();
        let added = engine
            .ingest_document(
                &session,
                "notes.txt",
                b"Some document text about the research subject.",
                "report",
                &PlainTextExtractor,
                None,
            )
            .await
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(session.index().unwrap().status().await.chunk_count, 1);
    }

    #[tokio::test]
    async fn test_ingest_empty_document_adds_nothing() {
        let (engine, _) = engine_with_counter();
        let session = engine.start_session();
        let added = engine
            .ingest_document(&session, "empty.txt", b"   ", "report", &PlainTextExtractor, None)
            .await
            .unwrap();
        assert_eq!(added, 0);
        assert!(!session.index().unwrap().status().await.initialized);
    }

    #[tokio::test]
    async fn test_ingest_unreadable_document_adds_nothing() {
        struct UnreadableExtractor;

        impl crate::extract::DocumentExtractor for UnreadableExtractor {
            fn extract(
                &self,
                name: &str,
                _bytes: &[u8],
            ) -> std::result::Result<crate::extract::ExtractedText, crate::error::ExtractError>
            {
                Err(crate::error::ExtractError::Unreadable {
                    name: name.to_string(),
                    message: "not a valid document".into(),
                })
            }

            fn extractor_name(&self) -> &str {
                "unreadable"
            }
        }

        let (engine, _) = engine_with_counter();
        let session = engine.start_session();
        let added = engine
            .ingest_document(
                &session,
                "corrupt.bin",
                b"\x00\x01\x02",
                "report",
                &UnreadableExtractor,
                None,
            )
            .await
            .unwrap();
        assert_eq!(added, 0);
        assert!(!session.index().unwrap().status().await.initialized);
    }

    #[tokio::test]
    async fn test_ingest_without_index_fails() {
        let (engine, _) = engine_with_counter();
        let session = ResearchSession::new(None);
        let err = engine
            .ingest_document(&session, "doc.txt", b"text", "report", &PlainTextExtractor, None)
            .await
            .unwrap_err();
        assert!(matches!(err, VeritasError::Index(_)));
    }

    #[tokio::test]
    async fn test_available_sources() {
        let (engine, _) = engine_with_counter();
        assert_eq!(engine.available_sources(), vec!["Counting"]);
    }

    #[tokio::test]
    async fn test_degraded_run_still_returns_records() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = SourceRegistry::new().with(Arc::new(CountingProvider {
            calls: calls.clone(),
        }));
        let engine = ResearchEngine::new(
            ResearchConfig::default(),
            registry,
            Arc::new(MockLlmClient::failing(crate::error::LlmError::EmptyResponse)),
        );
        let mut session = engine.start_session();
        let outcome = engine
            .conduct(&mut session, "topic", None, &NoOpProgress)
            .await
            .unwrap();
        assert!(outcome.degraded);
        assert_eq!(outcome.grouped_records[categories::WEB].len(), 1);
        assert!(outcome.report.contains("Unsynthesized"));
    }
}
