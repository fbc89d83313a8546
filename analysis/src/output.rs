//! Output formatting for analysis documents.
//!
//! Markdown, table, and CSV output mirror the classic spreadsheet layout: a
//! run information block, a summary with one row per timing group, and a
//! log section with one row per valid entry.

use perf_log_core::{EntryOutcome, GrammarSpec, GroupSummary};

use crate::report::{AnalysisDocument, analysis_errors, parse_messages};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    Json,
    Yaml,
    Markdown,
    Table,
    Csv,
}

impl OutputFormat {
    /// File extension used when writing this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Markdown => "md",
            Self::Table => "txt",
            Self::Csv => "csv",
        }
    }
}

/// Formats a document in the requested output format.
///
/// `spec` supplies the configured fields, which become extra columns in the
/// tabular formats.
pub fn format_document(
    doc: &AnalysisDocument,
    spec: &GrammarSpec,
    format: OutputFormat,
) -> Result<String, String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(doc).map_err(|e| format!("JSON serialization failed: {e}"))
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(doc).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(document_to_markdown(doc, spec)),
        OutputFormat::Table => Ok(document_to_table(doc, spec)),
        OutputFormat::Csv => document_to_csv(doc, spec),
    }
}

fn total_time_cell(outcome: &EntryOutcome) -> String {
    outcome
        .timing
        .total_time
        .map_or_else(String::new, |t| t.to_string())
}

fn group_cells(group: &GroupSummary) -> [String; 4] {
    match (
        group.stats.min_latency,
        group.stats.max_latency,
        group.average,
    ) {
        (Some(min), Some(max), Some(avg)) => [
            min.to_string(),
            max.to_string(),
            format!("{avg:.2}"),
            group.stats.count.to_string(),
        ],
        _ => [
            "no data".to_string(),
            "no data".to_string(),
            "no data".to_string(),
            "0".to_string(),
        ],
    }
}

fn entry_row(outcome: &EntryOutcome, spec: &GrammarSpec) -> Vec<String> {
    let mut row = vec![
        outcome.entry.line_number.to_string(),
        total_time_cell(outcome),
        parse_messages(outcome),
        analysis_errors(outcome),
    ];
    for field in &spec.fields {
        row.push(outcome.entry.field(&field.key).unwrap_or("").to_string());
    }
    row.push(outcome.entry.raw_text.clone());
    row
}

fn entry_header(spec: &GrammarSpec) -> Vec<String> {
    let mut header = vec![
        "Log Line".to_string(),
        "Total Processing Time".to_string(),
        "Parse Message".to_string(),
        "Analysis Errors".to_string(),
    ];
    header.extend(spec.fields.iter().map(|f| f.display_name.clone()));
    header.push("Full Log Entry".to_string());
    header
}

const SUMMARY_HEADER: [&str; 5] = [
    "Timing Group",
    "Min Time (ms)",
    "Max Time (ms)",
    "Avg Time (ms)",
    "Count",
];

fn document_to_markdown(doc: &AnalysisDocument, spec: &GrammarSpec) -> String {
    let info = &doc.run_info;
    let report = &doc.report;
    let mut out = String::new();

    out.push_str("# Analysis Results\n\n");
    out.push_str(&format!(
        "- **App:** {} {}\n",
        info.app_name, info.app_version
    ));
    out.push_str(&format!("- **Started:** {}\n", info.started_at));
    if let Some(ref input) = info.input {
        out.push_str(&format!("- **Input:** {input}\n"));
    }
    if let Some(ref fingerprint) = info.grammar_fingerprint {
        out.push_str(&format!("- **Grammar:** `{fingerprint}`\n"));
    }
    out.push_str(&format!(
        "- **Entries:** {} ({} valid, {} invalid)\n",
        report.total_count(),
        report.valid_count,
        report.invalid_count
    ));
    out.push_str(&format!(
        "- **Violations:** {}\n\n",
        report.violation_count()
    ));

    if !report.groups.is_empty() {
        out.push_str("## Analysis Summary\n\n");
        let header: Vec<String> = SUMMARY_HEADER.iter().map(|s| s.to_string()).collect();
        out.push_str(&markdown_header(&header));
        for group in &report.groups {
            let cells = std::iter::once(group.display_name.clone()).chain(group_cells(group));
            out.push_str(&markdown_row(cells));
        }
        out.push('\n');
    }

    if !report.entries.is_empty() {
        out.push_str("## Analysis Log\n\n");
        out.push_str(&markdown_header(&entry_header(spec)));
        for outcome in &report.entries {
            out.push_str(&markdown_row(entry_row(outcome, spec)));
        }
        out.push('\n');
    }

    out
}

fn markdown_row(cells: impl IntoIterator<Item = String>) -> String {
    let cells: Vec<String> = cells
        .into_iter()
        .map(|c| c.replace('|', "\\|"))
        .collect();
    format!("| {} |\n", cells.join(" | "))
}

fn markdown_header(header: &[String]) -> String {
    let mut out = markdown_row(header.iter().cloned());
    out.push_str(&format!("|{}\n", "---|".repeat(header.len())));
    out
}

fn document_to_table(doc: &AnalysisDocument, spec: &GrammarSpec) -> String {
    let report = &doc.report;
    let mut out = String::new();

    out.push_str(&format!(
        "{} {}  Started: {}\n",
        doc.run_info.app_name, doc.run_info.app_version, doc.run_info.started_at
    ));
    out.push_str(&format!(
        "Entries: {}  Valid: {}  Invalid: {}  Violations: {}\n",
        report.total_count(),
        report.valid_count,
        report.invalid_count,
        report.violation_count()
    ));

    if !report.groups.is_empty() {
        out.push_str("\nSummary:\n");
        let mut rows: Vec<Vec<String>> =
            vec![SUMMARY_HEADER.iter().map(|s| s.to_string()).collect()];
        for group in &report.groups {
            let mut row = vec![group.display_name.clone()];
            row.extend(group_cells(group));
            rows.push(row);
        }
        out.push_str(&aligned(&rows));
    }

    if !report.entries.is_empty() {
        out.push_str("\nLog:\n");
        let mut rows = vec![entry_header(spec)];
        rows.extend(report.entries.iter().map(|o| entry_row(o, spec)));
        out.push_str(&aligned(&rows));
    }

    out
}

/// Left-aligns every column to its widest cell.
fn aligned(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn document_to_csv(doc: &AnalysisDocument, spec: &GrammarSpec) -> Result<String, String> {
    let header: Vec<String> = SUMMARY_HEADER.iter().map(|s| s.to_string()).collect();
    let summary = std::iter::once(header).chain(doc.report.groups.iter().map(|group| {
        std::iter::once(group.display_name.clone())
            .chain(group_cells(group))
            .collect::<Vec<String>>()
    }));
    let log = std::iter::once(entry_header(spec))
        .chain(doc.report.entries.iter().map(|o| entry_row(o, spec)));

    let mut out = csv_section(summary)?;
    out.push('\n');
    out.push_str(&csv_section(log)?);
    Ok(out)
}

/// Writes one block of records; fields are quoted only where needed.
fn csv_section(rows: impl IntoIterator<Item = Vec<String>>) -> Result<String, String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| format!("CSV serialization failed: {e}"))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| format!("CSV serialization failed: {}", e.error()))?;
    String::from_utf8(bytes).map_err(|e| format!("CSV serialization failed: {e}"))
}
