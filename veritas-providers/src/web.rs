//! DuckDuckGo instant-answer provider.
//!
//! Uses the free instant-answer API (no key required). The abstract, when
//! present, becomes the first result; related topics fill the rest of the
//! budget. Nested topic groups are flattened.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use veritas_core::error::ProviderError;
use veritas_core::research::registry::SourceProvider;
use veritas_core::types::categories;

const API_BASE: &str = "https://api.duckduckgo.com/";
const PROVIDER_NAME: &str = "DuckDuckGo";

#[derive(Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "FirstURL", default)]
    first_url: String,
    /// Grouped topics nest one level deeper.
    #[serde(rename = "Topics", default)]
    topics: Vec<RelatedTopic>,
}

pub struct DuckDuckGoProvider {
    client: reqwest::Client,
}

impl DuckDuckGoProvider {
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Request {
                name: PROVIDER_NAME.into(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

fn flatten_topics(topics: Vec<RelatedTopic>, out: &mut Vec<serde_json::Value>, budget: usize) {
    for topic in topics {
        if out.len() >= budget {
            return;
        }
        if !topic.topics.is_empty() {
            flatten_topics(topic.topics, out, budget);
            continue;
        }
        if topic.text.trim().is_empty() {
            continue;
        }
        // The text runs title and description together; use the first
        // sentence-ish piece as the title.
        let title = topic
            .text
            .split(" - ")
            .next()
            .unwrap_or(&topic.text)
            .to_string();
        out.push(serde_json::json!({
            "title": title,
            "content": topic.text,
            "url": topic.first_url,
        }));
    }
}

#[async_trait]
impl SourceProvider for DuckDuckGoProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn category(&self) -> &str {
        categories::WEB
    }

    async fn fetch(
        &self,
        query: &str,
        budget: usize,
    ) -> Result<Vec<serde_json::Value>, ProviderError> {
        let url = format!(
            "{API_BASE}?q={}&format=json&no_html=1&skip_disambig=1",
            urlencoding::encode(query)
        );
        tracing::debug!(url = %url, "duckduckgo request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                name: PROVIDER_NAME.into(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Request {
                name: PROVIDER_NAME.into(),
                message: format!("status {}", response.status()),
            });
        }

        let answer: InstantAnswer =
            response.json().await.map_err(|e| ProviderError::Malformed {
                name: PROVIDER_NAME.into(),
                message: e.to_string(),
            })?;

        let mut results = Vec::new();
        if !answer.abstract_text.trim().is_empty() {
            results.push(serde_json::json!({
                "title": if answer.heading.is_empty() { query.to_string() } else { answer.heading },
                "content": answer.abstract_text,
                "url": answer.abstract_url,
            }));
        }
        flatten_topics(answer.related_topics, &mut results, budget);
        results.truncate(budget);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(text: &str, url: &str) -> RelatedTopic {
        RelatedTopic {
            text: text.into(),
            first_url: url.into(),
            topics: Vec::new(),
        }
    }

    #[test]
    fn test_flatten_respects_budget() {
        let topics = (0..10)
            .map(|i| topic(&format!("topic {i} - description"), "https://x"))
            .collect();
        let mut out = Vec::new();
        flatten_topics(topics, &mut out, 3);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_flatten_nested_groups() {
        let topics = vec![RelatedTopic {
            text: String::new(),
            first_url: String::new(),
            topics: vec![topic("nested - inner", "https://nested")],
        }];
        let mut out = Vec::new();
        flatten_topics(topics, &mut out, 5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["title"], "nested");
        assert_eq!(out[0]["url"], "https://nested");
    }

    #[test]
    fn test_flatten_skips_blank_text() {
        let topics = vec![topic("", "https://x"), topic("real - one", "https://y")];
        let mut out = Vec::new();
        flatten_topics(topics, &mut out, 5);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_instant_answer_parsing() {
        let json = r#"{
            "AbstractText": "Rust is a systems programming language.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Rust",
            "Heading": "Rust (programming language)",
            "RelatedTopics": [
                {"Text": "Cargo - the Rust package manager", "FirstURL": "https://doc.rust-lang.org/cargo/"}
            ]
        }"#;
        let answer: InstantAnswer = serde_json::from_str(json).unwrap();
        assert_eq!(answer.heading, "Rust (programming language)");
        assert_eq!(answer.related_topics.len(), 1);
    }

    // Requires network access
    #[tokio::test]
    #[ignore]
    async fn test_real_search() {
        let provider = DuckDuckGoProvider::new().unwrap();
        let results = provider.fetch("rust programming language", 3).await.unwrap();
        assert!(results.len() <= 3);
    }
}
