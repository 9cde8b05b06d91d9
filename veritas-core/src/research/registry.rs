//! Evidence source registry.
//!
//! Sources are explicit values handed to the engine, not ambient globals:
//! a registry is built once from configuration (or from fakes, in tests) and
//! every lookup goes through it. Registration order is preserved and defines
//! the order sources are consulted in.

use crate::error::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

/// A provider of external evidence.
///
/// Providers return their native response shapes as JSON values; the
/// aggregator normalizes them into [`crate::types::EvidenceRecord`]s. This
/// keeps providers free to expose whatever fields their upstream API has.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Display name, e.g. "DuckDuckGo" or "PubMed".
    fn name(&self) -> &str;

    /// Category key the results are grouped under.
    fn category(&self) -> &str;

    /// Fetch up to `budget` results for `query`.
    async fn fetch(&self, query: &str, budget: usize)
        -> Result<Vec<serde_json::Value>, ProviderError>;
}

/// Ordered collection of enabled evidence sources.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    providers: Vec<Arc<dyn SourceProvider>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. A provider with the same name replaces the
    /// earlier registration, keeping its original position.
    pub fn register(&mut self, provider: Arc<dyn SourceProvider>) {
        if let Some(existing) = self
            .providers
            .iter_mut()
            .find(|p| p.name() == provider.name())
        {
            *existing = provider;
        } else {
            self.providers.push(provider);
        }
    }

    /// Builder-style registration.
    #[must_use]
    pub fn with(mut self, provider: Arc<dyn SourceProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Providers in registration order.
    pub fn providers(&self) -> &[Arc<dyn SourceProvider>] {
        &self.providers
    }

    /// Display names of all registered providers, in order.
    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedProvider {
        name: &'static str,
        payload: &'static str,
    }

    #[async_trait]
    impl SourceProvider for NamedProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn category(&self) -> &str {
            "web"
        }

        async fn fetch(
            &self,
            _query: &str,
            _budget: usize,
        ) -> Result<Vec<serde_json::Value>, ProviderError> {
            Ok(vec![serde_json::json!({ "title": self.payload })])
        }
    }

    #[test]
    fn test_registration_order_preserved() {
        let registry = SourceRegistry::new()
            .with(Arc::new(NamedProvider { name: "b", payload: "1" }))
            .with(Arc::new(NamedProvider { name: "a", payload: "2" }))
            .with(Arc::new(NamedProvider { name: "c", payload: "3" }));
        assert_eq!(registry.names(), vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_same_name_replaces_in_place() {
        let registry = SourceRegistry::new()
            .with(Arc::new(NamedProvider { name: "a", payload: "old" }))
            .with(Arc::new(NamedProvider { name: "b", payload: "x" }))
            .with(Arc::new(NamedProvider { name: "a", payload: "new" }));
        assert_eq!(registry.names(), vec!["a", "b"]);
        let results = registry.providers()[0].fetch("q", 1).await.unwrap();
        assert_eq!(results[0]["title"], "new");
    }

    #[test]
    fn test_empty_registry() {
        let registry = SourceRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }
}
