//! Document text extraction.
//!
//! Extraction is a trait seam so the core never depends on a specific PDF
//! or OCR library: shells plug in whatever extractors their deployment
//! carries. The core supplies [`PlainTextExtractor`] for text files and the
//! [`FallbackPolicy`] that decides when a secondary (e.g. OCR) extraction
//! pass is worth running and whether its output should replace the direct
//! pass.

use crate::chunker::PageRange;
use crate::error::ExtractError;
use serde::{Deserialize, Serialize};

/// Text pulled out of a document, with optional page structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedText {
    /// The full extracted text.
    pub text: String,
    /// Byte ranges of `text` belonging to each page, in page order. Empty
    /// when the format has no page concept.
    pub pages: Vec<PageRange>,
}

impl ExtractedText {
    /// Wrap page-less text.
    pub fn flat(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pages: Vec::new(),
        }
    }

    /// Assemble from per-page strings, joining pages with a blank line and
    /// recording each page's byte range.
    pub fn from_pages<I, S>(page_texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut text = String::new();
        let mut pages = Vec::new();
        for (i, page_text) in page_texts.into_iter().enumerate() {
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            let start = text.len();
            text.push_str(page_text.as_ref());
            pages.push(PageRange {
                page: (i + 1) as u32,
                start,
                end: text.len(),
            });
        }
        Self { text, pages }
    }
}

/// Pluggable document extractor.
pub trait DocumentExtractor: Send + Sync {
    /// Extract text from raw document bytes.
    ///
    /// Returns `Ok` with possibly-empty text for readable documents;
    /// `Err` only when the document itself is unreadable or corrupted.
    fn extract(&self, name: &str, bytes: &[u8]) -> Result<ExtractedText, ExtractError>;

    /// Name used in logs and warnings.
    fn extractor_name(&self) -> &str;
}

/// Extractor for plain UTF-8 text files. Lossy decoding; text files have no
/// page structure.
pub struct PlainTextExtractor;

impl DocumentExtractor for PlainTextExtractor {
    fn extract(&self, _name: &str, bytes: &[u8]) -> Result<ExtractedText, ExtractError> {
        Ok(ExtractedText::flat(String::from_utf8_lossy(bytes)))
    }

    fn extractor_name(&self) -> &str {
        "plain_text"
    }
}

/// Decides when a secondary extraction pass (typically OCR) runs and wins.
///
/// Direct extraction is always tried first because it is cheap. The
/// secondary pass only runs when the direct result looks too thin to be the
/// real document text, and only replaces it when the gain is material.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FallbackPolicy {
    /// Direct results shorter than this (in chars) trigger the fallback pass.
    #[serde(default = "default_min_direct_chars")]
    pub min_direct_chars: usize,
    /// The fallback result must be at least this many times longer than the
    /// direct result to replace it.
    #[serde(default = "default_min_gain_ratio")]
    pub min_gain_ratio: f64,
}

fn default_min_direct_chars() -> usize {
    200
}

fn default_min_gain_ratio() -> f64 {
    1.1
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            min_direct_chars: default_min_direct_chars(),
            min_gain_ratio: default_min_gain_ratio(),
        }
    }
}

impl FallbackPolicy {
    /// Whether the fallback pass should run at all, given the direct result.
    pub fn should_attempt_fallback(&self, direct: &ExtractedText) -> bool {
        direct.text.trim().chars().count() < self.min_direct_chars
    }

    /// Whether the fallback result should replace the direct result.
    pub fn prefer_fallback(&self, direct: &ExtractedText, fallback: &ExtractedText) -> bool {
        let direct_len = direct.text.trim().chars().count();
        let fallback_len = fallback.text.trim().chars().count();
        if fallback_len == 0 {
            return false;
        }
        if direct_len == 0 {
            return true;
        }
        fallback_len as f64 > direct_len as f64 * self.min_gain_ratio
    }

    /// Run the full policy: take the direct result, optionally invoke the
    /// fallback extractor, and return whichever result wins along with the
    /// name of the extractor that produced it.
    pub fn resolve<'a>(
        &self,
        name: &str,
        bytes: &[u8],
        direct: ExtractedText,
        fallback: Option<&'a dyn DocumentExtractor>,
    ) -> (ExtractedText, Option<&'a str>) {
        if !self.should_attempt_fallback(&direct) {
            return (direct, None);
        }
        let Some(extractor) = fallback else {
            return (direct, None);
        };
        match extractor.extract(name, bytes) {
            Ok(recovered) if self.prefer_fallback(&direct, &recovered) => {
                tracing::info!(
                    document = name,
                    extractor = extractor.extractor_name(),
                    "fallback extraction replaced direct result"
                );
                (recovered, Some(extractor.extractor_name()))
            }
            Ok(_) => (direct, None),
            Err(e) => {
                tracing::warn!(document = name, error = %e, "fallback extraction failed");
                (direct, None)
            }
        }
    }
}
