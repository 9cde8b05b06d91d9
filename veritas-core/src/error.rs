//! Error types for the Veritas research core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering the LLM client, evidence providers, the embedding index, and
//! document extraction.

/// Top-level error type for the Veritas core library.
#[derive(Debug, thiserror::Error)]
pub enum VeritasError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from LLM client interactions.
///
/// The availability probe in the synthesis controller treats any variant as
/// "the model is unreachable" — callers never have to pattern-match response
/// text to detect failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("LLM client is not configured: {reason}")]
    NotConfigured { reason: String },

    #[error("LLM connection failed: {message}")]
    Connection { message: String },

    #[error("LLM rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("LLM API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned an empty response")]
    EmptyResponse,

    #[error("LLM request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Errors from evidence providers.
///
/// Provider failures are always recovered locally by the aggregator: one
/// failing provider becomes a warning string, never an aborted run.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider '{name}' request failed: {message}")]
    Request { name: String, message: String },

    #[error("Provider '{name}' returned a malformed response: {message}")]
    Malformed { name: String, message: String },

    #[error("Provider '{name}' timed out after {timeout_secs}s")]
    Timeout { name: String, timeout_secs: u64 },
}

impl ProviderError {
    /// The provider name carried by this error.
    pub fn provider_name(&self) -> &str {
        match self {
            ProviderError::Request { name, .. }
            | ProviderError::Malformed { name, .. }
            | ProviderError::Timeout { name, .. } => name,
        }
    }
}

/// Errors from the embedding index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The embedding backend could not be constructed. Fatal for the index:
    /// document retrieval is disabled for the run, other sources proceed.
    #[error("Embedding backend unavailable: {message}")]
    EmbedderUnavailable { message: String },

    #[error("Embedding request failed: {message}")]
    Embedding { message: String },

    #[error("Index state is inconsistent: {message}")]
    Inconsistent { message: String },
}

/// Errors from document extraction.
///
/// Corrupted or encrypted input is distinguishable from "extracted empty
/// text" so the caller can surface a warning instead of silently indexing
/// nothing.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Document '{name}' could not be read: {message}")]
    Unreadable { name: String, message: String },

    #[error("Document '{name}' is encrypted or corrupted")]
    Corrupted { name: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration load failed: {message}")]
    LoadFailed { message: String },
}

/// A type alias for results using the top-level `VeritasError`.
pub type Result<T> = std::result::Result<T, VeritasError>;
