//! Per-entry and aggregate result types produced by the analysis pipeline.
//!
//! The types are plain data designed for serialization with [`serde`], so a
//! finished [`AnalysisReport`] can be rendered as JSON, YAML, or tables
//! without further processing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One parsed log line.
///
/// Invalid entries (header not found) carry a diagnostic and no fields.
/// Valid entries may still carry diagnostics for discarded pairs.
///
/// # Examples
///
/// ```
/// use perf_log_core::ParsedEntry;
///
/// let entry = ParsedEntry::invalid(3, "garbage", "Header not found");
/// assert!(!entry.valid);
/// assert!(entry.fields.is_empty());
/// assert_eq!(entry.diagnostics, vec!["Header not found".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEntry {
    /// 1-based position of the line in the input.
    pub line_number: u64,
    /// The line without its terminator.
    pub raw_text: String,
    pub valid: bool,
    /// Parse messages, in the order they were produced.
    pub diagnostics: Vec<String>,
    /// Raw, un-parsed field values keyed by field name.
    pub fields: BTreeMap<String, String>,
}

impl ParsedEntry {
    /// Creates a valid entry with no fields yet.
    pub fn new(line_number: u64, raw_text: &str) -> Self {
        Self {
            line_number,
            raw_text: raw_text.to_string(),
            valid: true,
            diagnostics: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Creates an invalid entry with a single diagnostic.
    pub fn invalid(line_number: u64, raw_text: &str, diagnostic: &str) -> Self {
        Self {
            line_number,
            raw_text: raw_text.to_string(),
            valid: false,
            diagnostics: vec![diagnostic.to_string()],
            fields: BTreeMap::new(),
        }
    }

    /// Returns the raw value of `key`, if the entry carries it.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Latencies computed for one valid entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingResult {
    /// Delta in milliseconds keyed by pair key (`start-end`).
    pub per_pair_deltas: BTreeMap<String, i64>,
    /// End-to-end time; `None` when it could not be computed.
    pub total_time: Option<i64>,
    /// One message per threshold breach.
    pub violations: Vec<String>,
    /// Analysis errors such as a missing total time or a non-numeric value.
    pub diagnostics: Vec<String>,
}

impl TimingResult {
    /// Returns `true` if this entry may contribute to group statistics.
    pub fn is_aggregatable(&self) -> bool {
        self.total_time.is_some()
    }
}

/// A valid entry together with its timing outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOutcome {
    pub entry: ParsedEntry,
    pub timing: TimingResult,
}

/// Running latency statistics for one timing group.
///
/// `min_latency` and `max_latency` stay `None` until the first contribution,
/// so an empty group is distinguishable from one with a large minimum.
///
/// # Examples
///
/// ```
/// use perf_log_core::GroupStats;
///
/// let mut stats = GroupStats::default();
/// assert_eq!(stats.average(), None);
///
/// for total in [50, 30, 70] {
///     stats.record(total).unwrap();
/// }
/// assert_eq!(stats.count, 3);
/// assert_eq!(stats.min_latency, Some(30));
/// assert_eq!(stats.max_latency, Some(70));
/// assert_eq!(stats.average(), Some(50.0));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    pub count: u64,
    pub total_latency: i64,
    pub min_latency: Option<i64>,
    pub max_latency: Option<i64>,
}

/// The running latency total no longer fits in an `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("latency total overflows")]
pub struct StatsOverflow;

impl GroupStats {
    /// Adds one entry's total time.
    ///
    /// # Errors
    ///
    /// Returns [`StatsOverflow`] if the running total would overflow; `self`
    /// is left unchanged.
    pub fn record(&mut self, total_time: i64) -> Result<(), StatsOverflow> {
        let total_latency = self
            .total_latency
            .checked_add(total_time)
            .ok_or(StatsOverflow)?;
        self.count += 1;
        self.total_latency = total_latency;
        self.min_latency = Some(self.min_latency.map_or(total_time, |m| m.min(total_time)));
        self.max_latency = Some(self.max_latency.map_or(total_time, |m| m.max(total_time)));
        Ok(())
    }

    /// Folds statistics gathered elsewhere (e.g. another shard) into `self`.
    ///
    /// # Errors
    ///
    /// Returns [`StatsOverflow`] if the combined total would overflow; `self`
    /// is left unchanged.
    pub fn merge(&mut self, other: &GroupStats) -> Result<(), StatsOverflow> {
        let total_latency = self
            .total_latency
            .checked_add(other.total_latency)
            .ok_or(StatsOverflow)?;
        self.count += other.count;
        self.total_latency = total_latency;
        self.min_latency = match (self.min_latency, other.min_latency) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_latency = match (self.max_latency, other.max_latency) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        Ok(())
    }

    /// Mean total time, or `None` when no entry contributed.
    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.total_latency as f64 / self.count as f64)
        }
    }
}

/// Final statistics for one timing group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group_key: String,
    pub display_name: String,
    pub stats: GroupStats,
    /// `None` means "no data".
    pub average: Option<f64>,
}

/// Outcome of analyzing a whole log.
///
/// Holds no timestamps or other run-specific data, so analyzing the same
/// input twice yields equal reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub valid_count: u64,
    pub invalid_count: u64,
    /// Valid entries in input order.
    pub entries: Vec<EntryOutcome>,
    /// One summary per group definition, in definition order.
    pub groups: Vec<GroupSummary>,
}

impl AnalysisReport {
    /// Number of lines seen, valid or not.
    pub fn total_count(&self) -> u64 {
        self.valid_count + self.invalid_count
    }

    /// Total number of threshold violations across all entries.
    pub fn violation_count(&self) -> usize {
        self.entries.iter().map(|o| o.timing.violations.len()).sum()
    }

    /// Human-readable summary, one line per message, suitable for logging.
    ///
    /// # Examples
    ///
    /// ```
    /// use perf_log_core::AnalysisReport;
    ///
    /// let report = AnalysisReport { valid_count: 2, invalid_count: 1, ..Default::default() };
    /// assert_eq!(
    ///     report.summary_lines()[0],
    ///     "3 log entries analyzed - 2 valid entries included in analysis - \
    ///      1 invalid entries excluded from analysis"
    /// );
    /// ```
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} log entries analyzed - {} valid entries included in analysis - \
             {} invalid entries excluded from analysis",
            self.total_count(),
            self.valid_count,
            self.invalid_count
        )];

        for group in &self.groups {
            match (
                group.stats.min_latency,
                group.stats.max_latency,
                group.average,
            ) {
                (Some(min), Some(max), Some(avg)) => lines.push(format!(
                    "For timing group \"{}\", min time = {min} ms, max time = {max} ms, \
                     avg time = {avg:.2} ms",
                    group.display_name
                )),
                _ => lines.push(format!(
                    "For timing group \"{}\", no records found so no stats calculated",
                    group.display_name
                )),
            }
        }

        lines
    }
}
