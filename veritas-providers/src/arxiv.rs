//! arXiv provider.
//!
//! The arXiv API speaks Atom XML; the response is parsed with targeted
//! string scanning rather than a full XML library, since the feed shape is
//! fixed and shallow. Requests are spaced at least 3 seconds apart per the
//! arXiv API terms.

use async_trait::async_trait;
use std::time::Duration;
use veritas_core::error::ProviderError;
use veritas_core::research::registry::SourceProvider;
use veritas_core::types::categories;

const API_BASE: &str = "https://export.arxiv.org/api/query";
const PROVIDER_NAME: &str = "arXiv";

pub struct ArxivProvider {
    client: reqwest::Client,
    last_request: std::sync::Mutex<Option<std::time::Instant>>,
}

impl ArxivProvider {
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::Request {
                name: PROVIDER_NAME.into(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            last_request: std::sync::Mutex::new(None),
        })
    }

    /// Enforce the 3-second minimum spacing between arXiv API requests.
    async fn rate_limit(&self) {
        let wait = {
            let last = self.last_request.lock().unwrap();
            last.and_then(|instant| {
                let elapsed = instant.elapsed();
                (elapsed < Duration::from_secs(3)).then(|| Duration::from_secs(3) - elapsed)
            })
        }; // guard dropped before the await

        if let Some(wait) = wait {
            tokio::time::sleep(wait).await;
        }
        *self.last_request.lock().unwrap() = Some(std::time::Instant::now());
    }
}

#[async_trait]
impl SourceProvider for ArxivProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn category(&self) -> &str {
        categories::ACADEMIC
    }

    async fn fetch(
        &self,
        query: &str,
        budget: usize,
    ) -> Result<Vec<serde_json::Value>, ProviderError> {
        self.rate_limit().await;
        let url = format!(
            "{API_BASE}?search_query={}&start=0&max_results={budget}",
            urlencoding::encode(&format!("all:{query}"))
        );
        tracing::debug!(url = %url, "arxiv search");

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

        let body = response.text().await.map_err(|e| ProviderError::Request {
            name: PROVIDER_NAME.into(),
            message: e.to_string(),
        })?;

        Ok(parse_feed(&body))
    }
}

/// Parse an Atom feed into provider results.
fn parse_feed(xml: &str) -> Vec<serde_json::Value> {
    extract_entries(xml)
        .iter()
        .filter_map(|entry| parse_entry(entry))
        .collect()
}

/// Extract every `<entry>...</entry>` block.
fn extract_entries(xml: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut from = 0;
    while let Some(pos) = xml[from..].find("<entry>") {
        let start = from + pos;
        let Some(end_pos) = xml[start..].find("</entry>") else {
            break;
        };
        let end = start + end_pos + "</entry>".len();
        entries.push(&xml[start..end]);
        from = end;
    }
    entries
}

fn parse_entry(entry: &str) -> Option<serde_json::Value> {
    let id_url = tag_text(entry, "id")?;
    let title = normalize_whitespace(&tag_text(entry, "title")?);
    let summary = normalize_whitespace(&tag_text(entry, "summary").unwrap_or_default());
    let published = tag_text(entry, "published").unwrap_or_default();

    let mut authors = Vec::new();
    let mut from = 0;
    while let Some(pos) = entry[from..].find("<author>") {
        let start = from + pos;
        let Some(end_pos) = entry[start..].find("</author>") else {
            break;
        };
        let end = start + end_pos + "</author>".len();
        if let Some(name) = tag_text(&entry[start..end], "name") {
            authors.push(name);
        }
        from = end;
    }

    let arxiv_id = id_url
        .rsplit("/abs/")
        .next()
        .unwrap_or(&id_url)
        .to_string();

    Some(serde_json::json!({
        "title": title,
        "content": summary,
        "url": id_url,
        "arxiv_id": arxiv_id,
        "authors": authors,
        "published": published,
    }))
}

/// Text content of the first `<tag ...>text</tag>` occurrence.
fn tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let start = xml.find(&open)?;
    let content_start = xml[start..].find('>')? + start + 1;
    let content_end = xml[content_start..].find(&close)? + content_start;
    Some(xml[content_start..content_end].trim().to_string())
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
