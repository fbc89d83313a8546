//! Run metadata wrapped around an [`AnalysisReport`] for output.

use serde::{Deserialize, Serialize};

use perf_log_core::{AnalysisReport, EntryOutcome};

/// Name reported in run information.
pub const APP_NAME: &str = "Perf Log Analyzer";

/// Descriptive information about one analyzer run.
///
/// Kept apart from [`AnalysisReport`] so the report itself stays identical
/// across re-runs of the same input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub app_name: String,
    pub app_version: String,
    /// Start time of the run, as rendered by the caller.
    pub started_at: String,
    /// Path of the analyzed log, when it came from a file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// SHA-256 digest of the grammar used for the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar_fingerprint: Option<String>,
}

impl RunInfo {
    pub fn new(app_version: &str, started_at: &str) -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            app_version: app_version.to_string(),
            started_at: started_at.to_string(),
            input: None,
            grammar_fingerprint: None,
        }
    }

    pub fn with_input(mut self, input: &str) -> Self {
        self.input = Some(input.to_string());
        self
    }

    pub fn with_grammar_fingerprint(mut self, fingerprint: &str) -> Self {
        self.grammar_fingerprint = Some(fingerprint.to_string());
        self
    }
}

/// Everything written out for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDocument {
    pub run_info: RunInfo,
    pub report: AnalysisReport,
}

/// Joined parse diagnostics for one entry, as shown in tabular output.
pub fn parse_messages(outcome: &EntryOutcome) -> String {
    outcome.entry.diagnostics.join(", ")
}

/// Violations followed by analysis errors for one entry, as shown in tabular
/// output.
pub fn analysis_errors(outcome: &EntryOutcome) -> String {
    outcome
        .timing
        .violations
        .iter()
        .chain(&outcome.timing.diagnostics)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" - ")
}
