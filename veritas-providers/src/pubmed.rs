//! PubMed provider via the NCBI E-utilities.
//!
//! Two-step fetch: `esearch` resolves the query to PMIDs, `esummary` pulls
//! titles, journals, authors, and dates for them. Both use `retmode=json`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use veritas_core::error::ProviderError;
use veritas_core::research::registry::SourceProvider;
use veritas_core::types::categories;

const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const PROVIDER_NAME: &str = "PubMed";

#[derive(Deserialize)]
struct EsearchEnvelope {
    esearchresult: EsearchResult,
}

#[derive(Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

pub struct PubMedProvider {
    client: reqwest::Client,
}

impl PubMedProvider {
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

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .client
            .get(url)
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
        response.json().await.map_err(|e| ProviderError::Malformed {
            name: PROVIDER_NAME.into(),
            message: e.to_string(),
        })
    }
}

/// Pull the article entries out of an esummary response. The `result`
/// object maps uid -> summary, plus a `uids` array giving the order.
fn parse_summaries(value: &serde_json::Value) -> Vec<serde_json::Value> {
    let Some(result) = value.get("result") else {
        return Vec::new();
    };
    let uids: Vec<String> = result
        .get("uids")
        .and_then(|v| v.as_array())
        .map(|a| {
            a.iter()
                .filter_map(|u| u.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let mut out = Vec::new();
    for uid in uids {
        let Some(summary) = result.get(&uid) else {
            continue;
        };
        let title = summary
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("Untitled article");
        let journal = summary
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let pubdate = summary
            .get("pubdate")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let authors: Vec<String> = summary
            .get("authors")
            .and_then(|v| v.as_array())
            .map(|a| {
                a.iter()
                    .filter_map(|author| author.get("name").and_then(|n| n.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let content = if journal.is_empty() && pubdate.is_empty() {
            title.to_string()
        } else {
            format!("{title} ({journal}, {pubdate})")
        };

        out.push(serde_json::json!({
            "title": title,
            "content": content,
            "url": format!("https://pubmed.ncbi.nlm.nih.gov/{uid}/"),
            "pmid": uid,
            "journal": journal,
            "pubdate": pubdate,
            "authors": authors,
        }));
    }
    out
}

#[async_trait]
impl SourceProvider for PubMedProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn category(&self) -> &str {
        categories::LITERATURE
    }

    async fn fetch(
        &self,
        query: &str,
        budget: usize,
    ) -> Result<Vec<serde_json::Value>, ProviderError> {
        let search_url = format!(
            "{EUTILS_BASE}/esearch.fcgi?db=pubmed&term={}&retmax={budget}&retmode=json",
            urlencoding::encode(query)
        );
        tracing::debug!(url = %search_url, "pubmed esearch");
        let search_value = self.get_json(&search_url).await?;
        let envelope: EsearchEnvelope =
            serde_json::from_value(search_value).map_err(|e| ProviderError::Malformed {
                name: PROVIDER_NAME.into(),
                message: format!("esearch: {e}"),
            })?;

        if envelope.esearchresult.idlist.is_empty() {
            return Ok(Vec::new());
        }

        let summary_url = format!(
            "{EUTILS_BASE}/esummary.fcgi?db=pubmed&id={}&retmode=json",
            envelope.esearchresult.idlist.join(",")
        );
        tracing::debug!(url = %summary_url, "pubmed esummary");
        let summary_value = self.get_json(&summary_url).await?;

        Ok(parse_summaries(&summary_value))
    }
}
