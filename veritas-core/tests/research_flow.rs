//! End-to-end exercises of the research pipeline with fake providers and a
//! scripted LLM client.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use veritas_core::{
    categories, ChunkerConfig, EvidenceRecord, LlmError, MockLlmClient, NoOpProgress,
    PlainTextExtractor, ProviderError, RecordingProgress, ResearchConfig, ResearchEngine,
    SourceProvider, SourceRegistry,
};

struct FakeProvider {
    name: &'static str,
    category: &'static str,
    results: Vec<serde_json::Value>,
    calls: Arc<AtomicUsize>,
}

impl FakeProvider {
    fn new(name: &'static str, category: &'static str, titles: &[&str]) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Self {
            name,
            category,
            results: titles
                .iter()
                .map(|t| serde_json::json!({ "title": t, "content": format!("content of {t}") }))
                .collect(),
            calls: calls.clone(),
        };
        (provider, calls)
    }
}

#[async_trait]
impl SourceProvider for FakeProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> &str {
        self.category
    }

    async fn fetch(
        &self,
        _query: &str,
        budget: usize,
    ) -> Result<Vec<serde_json::Value>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.iter().take(budget).cloned().collect())
    }
}

struct BrokenProvider;

#[async_trait]
impl SourceProvider for BrokenProvider {
    fn name(&self) -> &str {
        "BrokenSource"
    }

    fn category(&self) -> &str {
        categories::LITERATURE
    }

    async fn fetch(
        &self,
        _query: &str,
        _budget: usize,
    ) -> Result<Vec<serde_json::Value>, ProviderError> {
        Err(ProviderError::Request {
            name: "BrokenSource".into(),
            message: "connection reset".into(),
        })
    }
}

#[tokio::test]
async fn broken_provider_does_not_abort_the_run() {
    let (web, _) = FakeProvider::new("FakeWeb", categories::WEB, &["w1", "w2"]);
    let registry = SourceRegistry::new()
        .with(Arc::new(BrokenProvider))
        .with(Arc::new(web));
    let engine = ResearchEngine::new(
        ResearchConfig::default(),
        registry,
        Arc::new(MockLlmClient::new("synthesis body")),
    );

    let mut session = engine.start_session();
    let outcome = engine
        .conduct(&mut session, "some topic", None, &NoOpProgress)
        .await
        .unwrap();

    assert!(!outcome.degraded);
    assert_eq!(outcome.grouped_records[categories::WEB].len(), 2);
    assert!(outcome.warnings.iter().any(|w| w.contains("BrokenSource")));
    assert!(outcome.report.contains("## Warnings"));
}

#[tokio::test]
async fn degraded_run_lists_every_gathered_record() {
    let (web, _) = FakeProvider::new("FakeWeb", categories::WEB, &["alpha", "beta"]);
    let (wiki, _) = FakeProvider::new("FakeWiki", categories::ENCYCLOPEDIA, &["gamma"]);
    let registry = SourceRegistry::new().with(Arc::new(web)).with(Arc::new(wiki));
    let engine = ResearchEngine::new(
        ResearchConfig::default(),
        registry,
        Arc::new(MockLlmClient::failing(LlmError::NotConfigured {
            reason: "no key".into(),
        })),
    );

    let mut session = engine.start_session();
    let outcome = engine
        .conduct(&mut session, "some topic", None, &NoOpProgress)
        .await
        .unwrap();

    assert!(outcome.degraded);
    for title in ["alpha", "beta", "gamma"] {
        assert!(outcome.report.contains(title), "report missing {title}");
    }
    assert!(outcome.report.contains("Unsynthesized"));
}

#[tokio::test]
async fn regeneration_reuses_records_without_refetching() {
    let (web, web_calls) = FakeProvider::new("FakeWeb", categories::WEB, &["keep", "drop"]);
    let registry = SourceRegistry::new().with(Arc::new(web));
    let llm = Arc::new(MockLlmClient::new("regenerated synthesis"));
    let engine = ResearchEngine::new(ResearchConfig::default(), registry, llm.clone());

    let mut session = engine.start_session();
    let outcome = engine
        .conduct(&mut session, "topic", None, &NoOpProgress)
        .await
        .unwrap();
    assert_eq!(web_calls.load(Ordering::SeqCst), 1);

    // Simulate the user deselecting one record, then re-synthesizing.
    let mut filtered = outcome.grouped_records.clone();
    filtered
        .get_mut(categories::WEB)
        .unwrap()
        .retain(|r: &EvidenceRecord| r.title == "keep");

    let regenerated = engine
        .regenerate(&mut session, "topic", filtered, &NoOpProgress)
        .await
        .unwrap();

    assert_eq!(web_calls.load(Ordering::SeqCst), 1);
    assert_eq!(regenerated.grouped_records[categories::WEB].len(), 1);
    assert!(session.last_outcome().unwrap().report.contains("regenerated synthesis"));
}

#[tokio::test]
async fn ingested_documents_surface_in_results_across_runs() {
    let registry = SourceRegistry::new();
    let mut config = ResearchConfig::default();
    // Small chunks so one paragraph produces several
    config.chunking = ChunkerConfig {
        chunk_size: 80,
        chunk_overlap: 10,
        ..Default::default()
    };
    let engine = ResearchEngine::new(config, registry, Arc::new(MockLlmClient::new("ok")));

    let mut session = engine.start_session();
    let first = engine
        .ingest_document(
            &session,
            "trial.txt",
            b"The clinical trial enrolled four hundred participants across nine sites. \
              Results showed a significant reduction in symptoms for the treatment group.",
            "report",
            &PlainTextExtractor,
            None,
        )
        .await
        .unwrap();
    assert!(first >= 1);

    let second = engine
        .ingest_document(
            &session,
            "followup.txt",
            b"A follow-up study of the clinical trial participants confirmed the findings.",
            "report",
            &PlainTextExtractor,
            None,
        )
        .await
        .unwrap();
    let status = session.index().unwrap().status().await;
    assert_eq!(status.chunk_count, first + second);

    let outcome = engine
        .conduct(&mut session, "clinical trial participants", None, &NoOpProgress)
        .await
        .unwrap();
    let docs = &outcome.grouped_records[categories::DOCUMENTS];
    assert!(!docs.is_empty());
    assert!(docs.iter().all(|r| r.category == categories::DOCUMENTS));

    // A second run hits the same persistent index
    let outcome2 = engine
        .conduct(&mut session, "follow-up study findings", None, &NoOpProgress)
        .await
        .unwrap();
    assert!(outcome2.grouped_records.contains_key(categories::DOCUMENTS));
}

#[tokio::test]
async fn run_with_no_results_produces_empty_report_without_llm_calls() {
    let llm = Arc::new(MockLlmClient::new("should not matter"));
    let engine = ResearchEngine::new(
        ResearchConfig::default(),
        SourceRegistry::new(),
        llm.clone(),
    );
    let mut session = engine.start_session();
    let outcome = engine
        .conduct(&mut session, "obscure topic", None, &NoOpProgress)
        .await
        .unwrap();

    assert!(outcome.grouped_records.is_empty());
    assert!(outcome.report.contains("No sources returned any results"));
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn progress_messages_cover_each_stage() {
    let (web, _) = FakeProvider::new("FakeWeb", categories::WEB, &["r1"]);
    let registry = SourceRegistry::new().with(Arc::new(web));
    let engine = ResearchEngine::new(
        ResearchConfig::default(),
        registry,
        Arc::new(MockLlmClient::new("body")),
    );

    let mut session = engine.start_session();
    let progress = RecordingProgress::new();
    engine
        .conduct(&mut session, "topic", None, &progress)
        .await
        .unwrap();

    let messages = progress.messages();
    assert!(messages.iter().any(|m| m.contains("Searching FakeWeb")));
    assert!(messages.iter().any(|m| m.contains("FakeWeb: 1 result(s)")));
    assert!(messages.iter().any(|m| m.contains("Summarizing")));
    assert!(messages.iter().any(|m| m.contains("final synthesis")));
}

#[tokio::test]
async fn category_order_in_report_is_deterministic() {
    let (a, _) = FakeProvider::new("A", categories::WEB, &["web result"]);
    let (b, _) = FakeProvider::new("B", categories::ACADEMIC, &["paper result"]);
    let registry = SourceRegistry::new().with(Arc::new(a)).with(Arc::new(b));
    let engine = ResearchEngine::new(
        ResearchConfig::default(),
        registry,
        Arc::new(MockLlmClient::failing(LlmError::EmptyResponse)),
    );

    let mut session = engine.start_session();
    let outcome = engine
        .conduct(&mut session, "topic", None, &NoOpProgress)
        .await
        .unwrap();

    // BTreeMap grouping: academic_papers sorts before web
    let academic = outcome.report.find("### Academic Papers").unwrap();
    let web = outcome.report.find("### Web").unwrap();
    assert!(academic < web);
}
