//! Grammar definitions describing how log lines are parsed and which
//! latencies are computed from them.
//!
//! A [`GrammarSpec`] is built once (usually from a configuration file) and
//! shared read-only by every component of the analysis pipeline.

use serde::{Deserialize, Serialize};

/// A named field extracted from log entries, kept for display and reporting.
///
/// # Examples
///
/// ```
/// use perf_log_core::LogField;
///
/// let field = LogField::new("region", "Region");
/// assert_eq!(field.key, "region");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogField {
    /// Key as it appears in the log line.
    pub key: String,
    /// Human-readable column name.
    pub display_name: String,
}

impl LogField {
    pub fn new(key: &str, display_name: &str) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// Two timestamp fields whose difference is a latency, with an upper bound.
///
/// The pair is identified by [`pair_key`](TimingPair::pair_key), which is
/// `start_key + "-" + end_key`.
///
/// # Examples
///
/// ```
/// use perf_log_core::TimingPair;
///
/// let pair = TimingPair::new("recv", "sent", "Receive to send", 25);
/// assert_eq!(pair.pair_key(), "recv-sent");
/// assert!(pair.exceeds(26));
/// assert!(!pair.exceeds(25));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingPair {
    /// Field holding the earlier timestamp.
    pub start_key: String,
    /// Field holding the later timestamp.
    pub end_key: String,
    /// Name used in reports and violation messages.
    pub display_name: String,
    /// Largest delta, in milliseconds, that is not reported as a violation.
    pub max_latency_ms: i64,
}

impl TimingPair {
    pub fn new(start_key: &str, end_key: &str, display_name: &str, max_latency_ms: i64) -> Self {
        Self {
            start_key: start_key.to_string(),
            end_key: end_key.to_string(),
            display_name: display_name.to_string(),
            max_latency_ms,
        }
    }

    /// Returns the identifying key of this pair.
    pub fn pair_key(&self) -> String {
        format!("{}-{}", self.start_key, self.end_key)
    }

    /// Returns `true` if `delta` is over the configured maximum.
    pub fn exceeds(&self, delta: i64) -> bool {
        delta > self.max_latency_ms
    }
}

/// A filter over entries (`field_key == field_value`) whose members have
/// their total times aggregated.
///
/// # Examples
///
/// ```
/// use perf_log_core::TimingGroup;
///
/// let group = TimingGroup::new("region", "east", "East region");
/// assert_eq!(group.group_key(), "region-east");
/// assert!(group.matches(Some("east")));
/// assert!(!group.matches(Some("west")));
/// assert!(!group.matches(None));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingGroup {
    pub field_key: String,
    pub field_value: String,
    pub display_name: String,
}

impl TimingGroup {
    pub fn new(field_key: &str, field_value: &str, display_name: &str) -> Self {
        Self {
            field_key: field_key.to_string(),
            field_value: field_value.to_string(),
            display_name: display_name.to_string(),
        }
    }

    /// Returns the identifying key of this group.
    pub fn group_key(&self) -> String {
        format!("{}-{}", self.field_key, self.field_value)
    }

    /// Returns `true` if an entry's value for `field_key` selects this group.
    pub fn matches(&self, value: Option<&str>) -> bool {
        value == Some(self.field_value.as_str())
    }
}

/// Complete description of a log grammar and the latencies to compute.
///
/// Separators are regular expression patterns; they are compiled by the
/// parser, not here, so the grammar stays plain data that serializes cleanly.
///
/// # Examples
///
/// ```
/// use perf_log_core::{GrammarSpec, TimingGroup, TimingPair};
///
/// let spec = GrammarSpec::new("EVENT", ",", "=", TimingPair::new("start", "end", "Total", 100))
///     .with_timing_pair(TimingPair::new("a", "b", "A-to-B", 5))
///     .with_timing_group(TimingGroup::new("region", "east", "East"));
///
/// assert!(spec.find_timing_pair("a-b").is_some());
/// assert!(spec.find_timing_group("region-east").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarSpec {
    /// Token marking the start of the key/value payload.
    pub header_token: String,
    /// Pattern separating one `key=value` pair from the next.
    pub pair_separator: String,
    /// Pattern separating a key from its value.
    pub field_separator: String,
    /// Fields of interest, in display order.
    #[serde(default)]
    pub fields: Vec<LogField>,
    /// Latency pairs, in configuration order.
    #[serde(default)]
    pub timing_pairs: Vec<TimingPair>,
    /// Aggregation groups, in configuration order.
    #[serde(default)]
    pub timing_groups: Vec<TimingGroup>,
    /// End-to-end latency definition; required for group aggregation.
    pub total_time: TimingPair,
}

impl GrammarSpec {
    pub fn new(
        header_token: &str,
        pair_separator: &str,
        field_separator: &str,
        total_time: TimingPair,
    ) -> Self {
        Self {
            header_token: header_token.to_string(),
            pair_separator: pair_separator.to_string(),
            field_separator: field_separator.to_string(),
            fields: Vec::new(),
            timing_pairs: Vec::new(),
            timing_groups: Vec::new(),
            total_time,
        }
    }

    pub fn with_field(mut self, field: LogField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_timing_pair(mut self, pair: TimingPair) -> Self {
        self.timing_pairs.push(pair);
        self
    }

    pub fn with_timing_group(mut self, group: TimingGroup) -> Self {
        self.timing_groups.push(group);
        self
    }

    /// Finds a timing pair by its `start-end` key.
    pub fn find_timing_pair(&self, pair_key: &str) -> Option<&TimingPair> {
        self.timing_pairs.iter().find(|p| p.pair_key() == pair_key)
    }

    /// Finds a timing group by its `field-value` key.
    pub fn find_timing_group(&self, group_key: &str) -> Option<&TimingGroup> {
        self.timing_groups
            .iter()
            .find(|g| g.group_key() == group_key)
    }
}
