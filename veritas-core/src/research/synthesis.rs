//! Two-stage synthesis controller.
//!
//! Stage A summarizes each evidence category independently; stage B writes
//! one balanced synthesis over the category summaries. An availability probe
//! runs first: if the model cannot answer a trivial prompt, the whole
//! synthesis degrades and the report carries raw grouped data instead. A
//! failure in a single stage A call only blanks that category's summary; a
//! failure in stage B falls back to the stitched stage A summaries.

use crate::llm::LlmClient;
use crate::types::{category_display_name, EvidenceRecord, GroupedRecords, ProgressSink};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-record content cap inside stage A prompts, in chars. Keeps prompts
/// bounded when a document chunk or abstract is long.
const RECORD_CONTENT_CAP: usize = 2000;

/// Target length of the final synthesis instruction.
const SYNTHESIS_SECTIONS: &str = "## Executive Summary\n\
## Key Findings\n\
## Source Analysis\n\
## Conclusions\n\
## Areas for Further Research";

/// Output of a synthesis run.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    /// Stage A summaries keyed by category, in category order.
    pub category_summaries: BTreeMap<String, String>,
    /// Stage B synthesis. `None` when the run degraded at the probe.
    pub synthesis: Option<String>,
    /// True when the availability probe failed and no model call was made.
    pub degraded: bool,
    /// Non-fatal warnings (per-category failures, stage B fallback).
    pub warnings: Vec<String>,
}

/// Runs the two-stage synthesis over grouped evidence.
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Probe model availability with a trivial completion.
    pub async fn probe(&self) -> bool {
        match self.llm.complete("Test", None).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "availability probe failed, degrading synthesis");
                false
            }
        }
    }

    /// Run the full synthesis: probe, stage A per category, stage B.
    ///
    /// Zero gathered records short-circuits before the probe; an empty run
    /// never costs a model call.
    pub async fn synthesize(
        &self,
        query: &str,
        grouped: &GroupedRecords,
        progress: &dyn ProgressSink,
    ) -> SynthesisResult {
        if crate::types::total_records(grouped) == 0 {
            return SynthesisResult {
                category_summaries: BTreeMap::new(),
                synthesis: None,
                degraded: false,
                warnings: Vec::new(),
            };
        }

        if !self.probe().await {
            return SynthesisResult {
                category_summaries: BTreeMap::new(),
                synthesis: None,
                degraded: true,
                warnings: vec!["Language model unavailable; report contains raw source data."
                    .to_string()],
            };
        }

        let mut warnings = Vec::new();
        let mut category_summaries = BTreeMap::new();

        for (category, records) in grouped {
            if records.is_empty() {
                continue;
            }
            let display = category_display_name(category);
            progress.on_progress(&format!("Summarizing {display} sources..."));

            match self.summarize_category(query, &display, records).await {
                Ok(summary) => {
                    category_summaries.insert(category.clone(), summary);
                }
                Err(e) => {
                    tracing::warn!(category = %category, error = %e, "category summary failed");
                    warnings.push(format!("Could not summarize {display} sources: {e}"));
                    category_summaries
                        .insert(category.clone(), format!("Error summarizing {display} sources."));
                }
            }
        }

        progress.on_progress("Writing final synthesis...");
        let synthesis = match self
            .synthesize_final(query, &category_summaries)
            .await
        {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(error = %e, "final synthesis failed, using category summaries");
                warnings.push(format!("Final synthesis failed: {e}"));
                Some(stitch_summaries(&category_summaries))
            }
        };

        SynthesisResult {
            category_summaries,
            synthesis,
            degraded: false,
            warnings,
        }
    }

    /// Stage A: summarize one category's records.
    async fn summarize_category(
        &self,
        query: &str,
        display: &str,
        records: &[EvidenceRecord],
    ) -> Result<String, crate::error::LlmError> {
        let mut prompt = format!(
            "Summarize the following {display} sources gathered for the research topic \
             \"{query}\".\n\
             Write a cohesive 200-400 word summary. Stick to what the sources say; note \
             agreements and contradictions between them. Do not invent facts.\n\nSources:\n"
        );
        for (i, record) in records.iter().enumerate() {
            prompt.push_str(&format!("\n--- Source {} ---\n", i + 1));
            prompt.push_str(&format!("Title: {}\n", record.title));
            if let Some(url) = &record.url {
                prompt.push_str(&format!("URL: {url}\n"));
            }
            prompt.push_str(&format!("Content: {}\n", truncate(&record.content)));
        }

        self.llm
            .complete(
                &prompt,
                Some("You are a meticulous research assistant summarizing evidence."),
            )
            .await
    }

    /// Stage B: one balanced synthesis over the category summaries.
    async fn synthesize_final(
        &self,
        query: &str,
        summaries: &BTreeMap<String, String>,
    ) -> Result<String, crate::error::LlmError> {
        let mut prompt = format!(
            "Write a research report on \"{query}\" based on the category summaries below.\n\
             Give balanced weight to every category; do not privilege one kind of source. \
             Where categories disagree, present both positions. Use exactly these markdown \
             sections:\n\n{SYNTHESIS_SECTIONS}\n\nCategory summaries:\n"
        );
        for (category, summary) in summaries {
            prompt.push_str(&format!(
                "\n### {}\n{}\n",
                category_display_name(category),
                summary
            ));
        }

        self.llm
            .complete(
                &prompt,
                Some("You are a research analyst writing a balanced synthesis report."),
            )
            .await
    }
}

fn truncate(text: &str) -> &str {
    if text.len() <= RECORD_CONTENT_CAP {
        return text;
    }
    let mut end = RECORD_CONTENT_CAP;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Fallback body when stage B fails: category summaries under headings.
fn stitch_summaries(summaries: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (category, summary) in summaries {
        out.push_str(&format!(
            "## {}\n\n{}\n\n",
            category_display_name(category),
            summary
        ));
    }
    out.trim_end().to_string()
}
