//! Fundamental types shared across the research pipeline.
//!
//! The central shape is [`EvidenceRecord`]: every provider's native response
//! is normalized into it before grouping, so the synthesis controller only
//! ever sees one record type regardless of where the evidence came from.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Well-known category keys. Providers may extend the set; these cover the
/// built-in sources and the document index.
pub mod categories {
    /// Web search results.
    pub const WEB: &str = "web";
    /// Biomedical literature (PubMed).
    pub const LITERATURE: &str = "literature";
    /// Encyclopedia articles (Wikipedia).
    pub const ENCYCLOPEDIA: &str = "encyclopedia";
    /// Academic preprints (arXiv).
    pub const ACADEMIC: &str = "academic_papers";
    /// Chunks retrieved from user-uploaded documents.
    pub const DOCUMENTS: &str = "documents";
}

/// A single piece of evidence, normalized from whatever shape the
/// originating provider returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceRecord {
    /// Display title. Falls back to a placeholder when the provider omitted it.
    pub title: String,
    /// Main text content (abstract, snippet, chunk text, ...).
    pub content: String,
    /// Link back to the source, when one exists.
    pub url: Option<String>,
    /// Category key this record is grouped under.
    pub category: String,
    /// Provider-specific extras (authors, journal, page numbers, ...).
    /// Kept generic so the core record shape never widens per provider.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl EvidenceRecord {
    /// Create a record with the minimum required fields.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            url: None,
            category: category.into(),
            metadata: HashMap::new(),
        }
    }

    /// Set the source URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Evidence grouped by category key.
///
/// A `BTreeMap` so iteration (and therefore report section order and merge
/// order) is deterministic regardless of provider completion order.
pub type GroupedRecords = BTreeMap<String, Vec<EvidenceRecord>>;

/// Count every record across all categories.
pub fn total_records(grouped: &GroupedRecords) -> usize {
    grouped.values().map(Vec::len).sum()
}

/// Turn a category key into a human-readable heading ("academic_papers" ->
/// "Academic Papers").
pub fn category_display_name(key: &str) -> String {
    key.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The unit returned to the shell after a research run.
///
/// `grouped_records` is returned alongside the report so the shell can let
/// the user deselect records and request re-synthesis without re-fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchOutcome {
    /// The assembled report (markdown).
    pub report: String,
    /// All gathered evidence, grouped by category.
    pub grouped_records: GroupedRecords,
    /// True when the LLM was unavailable and the report contains raw
    /// grouped data instead of synthesized prose.
    pub degraded: bool,
    /// Non-fatal warnings accumulated while gathering and synthesizing.
    pub warnings: Vec<String>,
}

/// Callback for incremental progress messages.
///
/// The core treats the sink as fire-and-forget: implementations must not
/// block or panic.
pub trait ProgressSink: Send + Sync {
    /// Called at each meaningful milestone with a human-readable message.
    fn on_progress(&self, message: &str);
}

/// No-op progress sink for tests and headless callers.
pub struct NoOpProgress;

impl ProgressSink for NoOpProgress {
    fn on_progress(&self, _message: &str) {}
}

/// Progress sink that records every message, for assertions in tests and
/// for shells that want to replay the log.
#[derive(Default)]
pub struct RecordingProgress {
    messages: std::sync::Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all messages received so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn on_progress(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
