//! Built-in evidence source providers for Veritas.
//!
//! Each provider wraps one free external API and implements
//! [`veritas_core::SourceProvider`], returning its native result shapes as
//! JSON for the core aggregator to normalize. [`build_registry`] assembles
//! the standard set from configuration flags.

pub mod arxiv;
pub mod documents;
pub mod pubmed;
pub mod web;
pub mod wikipedia;

pub use arxiv::ArxivProvider;
pub use documents::StubDocumentProvider;
pub use pubmed::PubMedProvider;
pub use web::DuckDuckGoProvider;
pub use wikipedia::WikipediaProvider;

use std::sync::Arc;
use veritas_core::config::SourcesConfig;
use veritas_core::error::ProviderError;
use veritas_core::research::registry::SourceRegistry;

/// Build a registry containing the enabled built-in providers, in the
/// standard consultation order.
pub fn build_registry(sources: &SourcesConfig) -> Result<SourceRegistry, ProviderError> {
    let mut registry = SourceRegistry::new();
    if sources.web_search {
        registry.register(Arc::new(DuckDuckGoProvider::new()?));
    }
    if sources.pubmed {
        registry.register(Arc::new(PubMedProvider::new()?));
    }
    if sources.wikipedia {
        registry.register(Arc::new(WikipediaProvider::new()?));
    }
    if sources.arxiv {
        registry.register(Arc::new(ArxivProvider::new()?));
    }
    if sources.document_apis {
        registry.register(Arc::new(StubDocumentProvider));
    }
    Ok(registry)
}
