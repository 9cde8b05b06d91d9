//! Evidence aggregation across sources.
//!
//! Consults every registered provider in order, normalizes whatever shapes
//! they return into [`EvidenceRecord`]s, and folds in chunks retrieved from
//! the document index. One failing or hanging provider never aborts the run:
//! its failure becomes a warning and the gather continues.

use crate::config::{SourceBudgets, TimeoutsConfig};
use crate::index::EmbeddingIndex;
use crate::research::registry::SourceRegistry;
use crate::types::{categories, EvidenceRecord, GroupedRecords, ProgressSink};
use std::collections::HashSet;
use std::time::Duration;

/// Gathers and normalizes evidence for a query.
pub struct Aggregator {
    budgets: SourceBudgets,
    provider_timeout: Duration,
}

impl Aggregator {
    pub fn new(budgets: SourceBudgets, timeouts: &TimeoutsConfig) -> Self {
        Self {
            budgets,
            provider_timeout: Duration::from_secs(timeouts.provider_secs),
        }
    }

    /// Gather evidence from every registered provider plus the document
    /// index, grouped by category.
    ///
    /// `label_filter` restricts retrieved document chunks to an allowed set
    /// of labels. Returns the grouped records and any non-fatal warnings
    /// accumulated along the way.
    pub async fn gather(
        &self,
        query: &str,
        registry: &SourceRegistry,
        index: Option<&EmbeddingIndex>,
        label_filter: Option<&HashSet<String>>,
        progress: &dyn ProgressSink,
    ) -> (GroupedRecords, Vec<String>) {
        let mut grouped = GroupedRecords::new();
        let mut warnings = Vec::new();

        for provider in registry.providers() {
            let name = provider.name();
            let category = provider.category();
            let budget = self.budgets.for_category(category);
            progress.on_progress(&format!("Searching {name}..."));

            let fetched =
                tokio::time::timeout(self.provider_timeout, provider.fetch(query, budget)).await;

            match fetched {
                Ok(Ok(values)) => {
                    let records = grouped.entry(category.to_string()).or_default();
                    let before = records.len();
                    for value in values.into_iter().take(budget) {
                        match normalize(value, category) {
                            Some(record) => records.push(record),
                            None => {
                                tracing::warn!(provider = name, "skipping non-object result");
                                warnings.push(format!(
                                    "{name} returned a result that could not be interpreted"
                                ));
                            }
                        }
                    }
                    progress.on_progress(&format!(
                        "{name}: {} result(s)",
                        records.len() - before
                    ));
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider = name, error = %e, "provider failed");
                    warnings.push(format!("{name} failed: {e}"));
                    progress.on_progress(&format!("{name} failed"));
                }
                Err(_) => {
                    tracing::warn!(
                        provider = name,
                        timeout_secs = self.provider_timeout.as_secs(),
                        "provider timed out"
                    );
                    warnings.push(format!(
                        "{name} timed out after {}s",
                        self.provider_timeout.as_secs()
                    ));
                    progress.on_progress(&format!("{name} timed out"));
                }
            }
        }

        if let Some(index) = index {
            progress.on_progress("Searching uploaded documents...");
            let retrieved = index.query(query, self.budgets.documents).await;
            let records = retrieved
                .into_iter()
                .filter(|r| label_filter.map_or(true, |labels| labels.contains(&r.chunk.label)))
                .map(|r| {
                    let chunk = r.chunk;
                    EvidenceRecord::new(
                        format!(
                            "{} (part {}/{})",
                            chunk.source_name, chunk.ordinal, chunk.total_chunks
                        ),
                        chunk.text,
                        categories::DOCUMENTS,
                    )
                    .with_meta("source_name", serde_json::json!(chunk.source_name))
                    .with_meta("page_number", serde_json::json!(chunk.page_number))
                    .with_meta("label", serde_json::json!(chunk.label))
                    .with_meta("score", serde_json::json!(r.score))
                })
                .collect::<Vec<_>>();
            progress.on_progress(&format!("Documents: {} chunk(s) retrieved", records.len()));
            if !records.is_empty() {
                // Extend, never insert: a documents-category provider may
                // already have contributed records for this key.
                grouped
                    .entry(categories::DOCUMENTS.to_string())
                    .or_default()
                    .extend(records);
            }
        }

        (grouped, warnings)
    }
}

/// Normalize a provider's native JSON result into an [`EvidenceRecord`].
///
/// `title` falls back to a placeholder; `content` also accepts `snippet`;
/// `url` also accepts `href`. Everything else lands in metadata. Non-object
/// values are rejected.
fn normalize(value: serde_json::Value, category: &str) -> Option<EvidenceRecord> {
    let serde_json::Value::Object(map) = value else {
        return None;
    };

    let as_text = |v: Option<&serde_json::Value>| -> Option<String> {
        v.and_then(|v| v.as_str()).map(str::to_string)
    };

    let title = as_text(map.get("title"))
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Untitled".to_string());
    let content = as_text(map.get("content"))
        .or_else(|| as_text(map.get("snippet")))
        .unwrap_or_default();
    let url = as_text(map.get("url")).or_else(|| as_text(map.get("href")));

    let mut record = EvidenceRecord::new(title, content, category);
    record.url = url;
    for (key, value) in map {
        if !matches!(key.as_str(), "title" | "content" | "snippet" | "url" | "href") {
            record.metadata.insert(key, value);
        }
    }
    Some(record)
}
