//! Wikipedia provider via the MediaWiki search API.
//!
//! Search snippets come back with HTML highlight markup; tags are stripped
//! before the snippet is exposed as content.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use veritas_core::error::ProviderError;
use veritas_core::research::registry::SourceProvider;
use veritas_core::types::categories;

const API_BASE: &str = "https://en.wikipedia.org/w/api.php";
const PROVIDER_NAME: &str = "Wikipedia";

#[derive(Deserialize)]
struct SearchEnvelope {
    query: SearchQuery,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    pageid: u64,
}

fn tag_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"<[^>]+>").unwrap())
}

/// Strip HTML tags and unescape the entities MediaWiki snippets carry.
fn strip_html(snippet: &str) -> String {
    let stripped = tag_pattern().replace_all(snippet, "");
    stripped
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#39;", "'")
}

fn article_url(title: &str) -> String {
    format!(
        "https://en.wikipedia.org/wiki/{}",
        urlencoding::encode(&title.replace(' ', "_"))
    )
}

pub struct WikipediaProvider {
    client: reqwest::Client,
}

impl WikipediaProvider {
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

#[async_trait]
impl SourceProvider for WikipediaProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn category(&self) -> &str {
        categories::ENCYCLOPEDIA
    }

    async fn fetch(
        &self,
        query: &str,
        budget: usize,
    ) -> Result<Vec<serde_json::Value>, ProviderError> {
        let url = format!(
            "{API_BASE}?action=query&list=search&srsearch={}&srlimit={budget}&format=json",
            urlencoding::encode(query)
        );
        tracing::debug!(url = %url, "wikipedia search");

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

        let envelope: SearchEnvelope =
            response.json().await.map_err(|e| ProviderError::Malformed {
                name: PROVIDER_NAME.into(),
                message: e.to_string(),
            })?;

        Ok(envelope
            .query
            .search
            .into_iter()
            .map(|hit| {
                serde_json::json!({
                    "title": hit.title,
                    "content": strip_html(&hit.snippet),
                    "url": article_url(&hit.title),
                    "pageid": hit.pageid,
                })
            })
            .collect())
    }
}
