//! Configuration for the research core.
//!
//! Uses `figment` for layered configuration: defaults -> config file ->
//! `VERITAS_`-prefixed environment variables. Source enablement and the
//! per-category result budgets live in one explicit table here rather than
//! as scattered literals or ambient environment lookups, so tests can
//! construct isolated configurations and inject fakes.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::chunker::ChunkerConfig;
use crate::embeddings::EmbeddingConfig;
use crate::error::ConfigError;
use crate::extract::FallbackPolicy;
use crate::llm::LlmConfig;

/// Top-level configuration for a research engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// LLM client settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Embedding backend settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Document chunking settings.
    #[serde(default)]
    pub chunking: ChunkerConfig,
    /// When a secondary extraction pass runs and wins.
    #[serde(default)]
    pub extraction: FallbackPolicy,
    /// Which evidence sources are enabled.
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Per-category result-count budgets.
    #[serde(default)]
    pub budgets: SourceBudgets,
    /// External call timeouts.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

/// Enablement flags for the built-in evidence sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_true")]
    pub web_search: bool,
    #[serde(default = "default_true")]
    pub pubmed: bool,
    #[serde(default = "default_true")]
    pub wikipedia: bool,
    #[serde(default = "default_true")]
    pub arxiv: bool,
    #[serde(default)]
    pub document_apis: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            web_search: true,
            pubmed: true,
            wikipedia: true,
            arxiv: true,
            document_apis: false,
        }
    }
}

/// Per-category result-count budgets.
///
/// The defaults match the original deployment's caps. They are tuning
/// knobs, not contracts — free-tier APIs tolerate small result counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBudgets {
    #[serde(default = "default_web_budget")]
    pub web: usize,
    #[serde(default = "default_literature_budget")]
    pub literature: usize,
    #[serde(default = "default_generic_budget")]
    pub encyclopedia: usize,
    #[serde(default = "default_generic_budget")]
    pub academic_papers: usize,
    /// How many indexed document chunks to retrieve per query.
    #[serde(default = "default_document_budget")]
    pub documents: usize,
}

fn default_web_budget() -> usize {
    3
}

fn default_literature_budget() -> usize {
    3
}

fn default_generic_budget() -> usize {
    10
}

fn default_document_budget() -> usize {
    5
}

impl Default for SourceBudgets {
    fn default() -> Self {
        Self {
            web: 3,
            literature: 3,
            encyclopedia: 10,
            academic_papers: 10,
            documents: 5,
        }
    }
}

impl SourceBudgets {
    /// Look up the budget for a category key, falling back to the generic
    /// default for provider-specific extensions.
    pub fn for_category(&self, category: &str) -> usize {
        match category {
            crate::types::categories::WEB => self.web,
            crate::types::categories::LITERATURE => self.literature,
            crate::types::categories::ENCYCLOPEDIA => self.encyclopedia,
            crate::types::categories::ACADEMIC => self.academic_papers,
            crate::types::categories::DOCUMENTS => self.documents,
            _ => default_generic_budget(),
        }
    }
}

/// Timeouts for external calls.
///
/// Provider calls are bounded tightly; LLM calls get longer since synthesis
/// prompts are large.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_provider_timeout")]
    pub provider_secs: u64,
    #[serde(default = "default_llm_timeout")]
    pub llm_secs: u64,
}

fn default_provider_timeout() -> u64 {
    30
}

fn default_llm_timeout() -> u64 {
    120
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            provider_secs: 30,
            llm_secs: 120,
        }
    }
}

/// Load configuration with figment layering.
///
/// Order: built-in defaults, then the TOML file at `config_path` (if it
/// exists), then `VERITAS_`-prefixed environment variables (nested fields
/// split on `__`, e.g. `VERITAS_SOURCES__PUBMED=false`).
pub fn load_config(config_path: Option<&Path>) -> Result<ResearchConfig, ConfigError> {
    // Pick up a .env file when one exists; missing is fine.
    let _ = dotenvy::dotenv();

    let mut figment = Figment::from(Serialized::defaults(ResearchConfig::default()));

    if let Some(path) = config_path {
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }
    }

    figment = figment.merge(Env::prefixed("VERITAS_").split("__"));

    figment.extract().map_err(|e| ConfigError::LoadFailed {
        message: e.to_string(),
    })
}
