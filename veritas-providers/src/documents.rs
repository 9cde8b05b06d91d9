//! External document-repository provider.
//!
//! Stands in for deployments that expose an internal document API next to
//! the locally ingested files. Disabled by default in configuration. The
//! stub returns a small deterministic set so shells can exercise the
//! documents category end to end without a real backend.

use async_trait::async_trait;
use veritas_core::error::ProviderError;
use veritas_core::research::registry::SourceProvider;
use veritas_core::types::categories;

/// Deterministic stand-in for an external document API.
pub struct StubDocumentProvider;

#[async_trait]
impl SourceProvider for StubDocumentProvider {
    fn name(&self) -> &str {
        "DocumentApi"
    }

    fn category(&self) -> &str {
        categories::DOCUMENTS
    }

    async fn fetch(
        &self,
        query: &str,
        budget: usize,
    ) -> Result<Vec<serde_json::Value>, ProviderError> {
        tracing::debug!(query, "serving stub document API results");
        let samples = [
            (
                "Sample report",
                "Placeholder report content from the stub document API.",
            ),
            (
                "Sample whitepaper",
                "Placeholder whitepaper content from the stub document API.",
            ),
        ];
        Ok(samples
            .iter()
            .take(budget)
            .map(|(title, content)| {
                serde_json::json!({
                    "title": title,
                    "content": content,
                    "query": query,
                })
            })
            .collect())
    }
}
