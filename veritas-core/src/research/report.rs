//! Markdown report assembly.
//!
//! Pure string building over gathered evidence and synthesis output. The
//! same assembler serves the healthy path (synthesis plus category summary
//! appendix), the degraded path (raw grouped evidence), and the empty run.

use crate::research::synthesis::SynthesisResult;
use crate::types::{category_display_name, total_records, GroupedRecords};

/// Excerpt length for raw evidence listings in degraded reports.
const EXCERPT_CHARS: usize = 300;

/// Assemble the final markdown report.
pub fn assemble_report(
    query: &str,
    grouped: &GroupedRecords,
    synthesis: &SynthesisResult,
    warnings: &[String],
) -> String {
    let mut report = String::new();
    report.push_str(&format!("# Research Report: {query}\n\n"));
    report.push_str(&format!(
        "*Generated {}*\n\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
    ));

    let total = total_records(grouped);
    if total == 0 {
        report.push_str("No sources returned any results for this query.\n");
        if !warnings.is_empty() {
            push_warnings(&mut report, warnings);
        }
        return report;
    }

    report.push_str("## Sources Consulted\n\n");
    for (category, records) in grouped {
        if !records.is_empty() {
            report.push_str(&format!(
                "- {}: {} result{}\n",
                category_display_name(category),
                records.len(),
                if records.len() == 1 { "" } else { "s" }
            ));
        }
    }
    report.push_str(&format!("\nTotal: {total} sources\n\n"));

    if synthesis.degraded {
        report.push_str("## Gathered Evidence (Unsynthesized)\n\n");
        report.push_str(
            "The language model was unavailable; raw source data is listed below.\n\n",
        );
        for (category, records) in grouped {
            if records.is_empty() {
                continue;
            }
            report.push_str(&format!("### {}\n\n", category_display_name(category)));
            for record in records {
                match &record.url {
                    Some(url) => report.push_str(&format!("- **{}** ({url})\n", record.title)),
                    None => report.push_str(&format!("- **{}**\n", record.title)),
                }
                let excerpt = excerpt(&record.content);
                if !excerpt.is_empty() {
                    report.push_str(&format!("  {excerpt}\n"));
                }
            }
            report.push('\n');
        }
    } else {
        if let Some(body) = &synthesis.synthesis {
            report.push_str(body.trim());
            report.push_str("\n\n");
        }
        if !synthesis.category_summaries.is_empty() {
            report.push_str("## Appendix: Category Summaries\n\n");
            for (category, summary) in &synthesis.category_summaries {
                report.push_str(&format!(
                    "### {}\n\n{}\n\n",
                    category_display_name(category),
                    summary.trim()
                ));
            }
        }
    }

    if !warnings.is_empty() {
        push_warnings(&mut report, warnings);
    }

    report
}

fn push_warnings(report: &mut String, warnings: &[String]) {
    report.push_str("## Warnings\n\n");
    for warning in warnings {
        report.push_str(&format!("- {warning}\n"));
    }
}

fn excerpt(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(EXCERPT_CHARS).collect();
    format!("{cut}...")
}
