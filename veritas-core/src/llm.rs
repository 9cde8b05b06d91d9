//! LLM client abstraction and the OpenAI-compatible HTTP implementation.
//!
//! Completion is a `Result`: every failure mode is a structured [`LlmError`]
//! variant, so callers branch on the error type instead of scanning response
//! text for failure markers. The synthesis controller leans on this for its
//! availability probe.

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// LLM client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name, e.g. "gpt-4o-mini" or "o3-mini".
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Base URL of the OpenAI-compatible endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Completion token cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature. Ignored for reasoning models.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl LlmConfig {
    /// Reasoning models (o1/o3 family) take a different parameter set:
    /// `max_completion_tokens` plus `reasoning_effort`, no temperature, and
    /// a `developer` role instead of `system`.
    pub fn is_reasoning_model(&self) -> bool {
        let model = self.model.to_lowercase();
        model.starts_with("o1") || model.starts_with("o3") || model.starts_with("o4")
    }
}

/// A text completion client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete `prompt`, optionally under a system instruction.
    ///
    /// `Ok` always carries non-empty text; every failure mode, including an
    /// empty model response, is an `Err`.
    async fn complete(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError>;

    /// Model name, for logs and report footers.
    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'a str>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for OpenAI-compatible chat-completion endpoints.
#[derive(Debug)]
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: String,
    timeout_secs: u64,
}

impl OpenAiCompatibleClient {
    /// Build a client from config. Fails with [`LlmError::NotConfigured`]
    /// when the API key environment variable is absent or empty.
    pub fn new(config: LlmConfig, timeout_secs: u64) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(LlmError::NotConfigured {
                reason: format!("environment variable {} is not set", config.api_key_env),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            config,
            api_key,
            timeout_secs,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        let reasoning = self.config.is_reasoning_model();

        let mut messages = Vec::new();
        if let Some(instruction) = system {
            messages.push(ChatMessage {
                // Reasoning models replaced the system role with developer.
                role: if reasoning { "developer" } else { "system" },
                content: instruction,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: (!reasoning).then_some(self.config.temperature),
            max_tokens: (!reasoning).then_some(self.config.max_tokens),
            max_completion_tokens: reasoning.then_some(self.config.max_tokens),
            reasoning_effort: reasoning.then_some("high"),
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    LlmError::Connection {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(LlmError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| LlmError::Connection {
            message: format!("malformed completion response: {e}"),
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Scriptable LLM client for tests.
///
/// Responses are dequeued in order; once the queue is empty every call
/// returns the fallback response. Prompts are recorded for assertions.
pub struct MockLlmClient {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<String, LlmError>>>,
    fallback: Result<String, LlmError>,
    calls: std::sync::Mutex<Vec<String>>,
}

impl MockLlmClient {
    /// A mock that answers every call with `response`.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            responses: std::sync::Mutex::new(std::collections::VecDeque::new()),
            fallback: Ok(response.into()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A mock that fails every call with `error`.
    pub fn failing(error: LlmError) -> Self {
        Self {
            responses: std::sync::Mutex::new(std::collections::VecDeque::new()),
            fallback: Err(error),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Queue a response to be returned before the fallback kicks in.
    pub fn push_response(&self, response: Result<String, LlmError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, prompt: &str, _system: Option<&str>) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(prompt.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => self.fallback.clone(),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
