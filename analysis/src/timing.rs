//! Per-entry latency calculation and threshold checks.
//!
//! For every timing pair whose two fields are present in an entry, the delta
//! `end - start` is computed with integer arithmetic and compared against the
//! pair's maximum. A pair with a missing field is skipped silently; entries
//! do not have to carry every field. The total time is computed the same
//! way, but a missing total time is reported because group aggregation needs
//! it.

use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

use perf_log_core::{GrammarSpec, ParsedEntry, TimingPair, TimingResult};

/// Errors recorded as diagnostics on a [`TimingResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimingError {
    /// A total-time key is absent or its delta could not be computed.
    #[error("cannot calculate total time")]
    MissingTotalTime,

    /// A timestamp field does not hold an integer.
    #[error("On log line #{line}, {pair}: value '{value}' of field '{key}' is not an integer")]
    InvalidInteger {
        line: u64,
        pair: String,
        key: String,
        value: String,
    },

    /// The delta does not fit in 64 bits.
    #[error("On log line #{line}, {pair}: delta overflows")]
    Overflow { line: u64, pair: String },
}

/// A computed delta that exceeds its configured maximum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Pair {
        line: u64,
        display_name: String,
        start_key: String,
        end_key: String,
        delta: i64,
        max_latency_ms: i64,
    },
    TotalTime {
        line: u64,
        delta: i64,
        max_latency_ms: i64,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pair {
                line,
                display_name,
                start_key,
                end_key,
                delta,
                max_latency_ms,
            } => write!(
                f,
                "On log line #{line}, {display_name} ({start_key} -> {end_key}) delta of \
                 {delta} ms exceeds max allowed ({max_latency_ms} ms)"
            ),
            Self::TotalTime {
                line,
                delta,
                max_latency_ms,
            } => write!(
                f,
                "On log line #{line}, total time of {delta} ms exceeds max allowed \
                 ({max_latency_ms} ms)"
            ),
        }
    }
}

/// Computes deltas, total time, and violations for one valid entry.
///
/// # Examples
///
/// ```
/// use perf_log_analysis::parser::LineParser;
/// use perf_log_analysis::timing::evaluate;
/// use perf_log_core::{GrammarSpec, TimingPair};
///
/// let spec = GrammarSpec::new("EVENT", ",", "=", TimingPair::new("start", "end", "Total", 100))
///     .with_timing_pair(TimingPair::new("a", "b", "A-to-B", 5));
/// let entry = LineParser::new(&spec).unwrap().parse("EVENT a=10,b=20,start=0,end=40", 1);
///
/// let timing = evaluate(&entry, &spec);
/// assert_eq!(timing.per_pair_deltas["a-b"], 10);
/// assert_eq!(timing.total_time, Some(40));
/// assert_eq!(timing.violations.len(), 1);
/// ```
pub fn evaluate(entry: &ParsedEntry, spec: &GrammarSpec) -> TimingResult {
    let mut result = TimingResult::default();

    for pair in &spec.timing_pairs {
        match pair_delta(entry, pair) {
            Ok(Some(delta)) => {
                if pair.exceeds(delta) {
                    let violation = Violation::Pair {
                        line: entry.line_number,
                        display_name: pair.display_name.clone(),
                        start_key: pair.start_key.clone(),
                        end_key: pair.end_key.clone(),
                        delta,
                        max_latency_ms: pair.max_latency_ms,
                    };
                    info!(line = entry.line_number, pair = %pair.pair_key(), delta, "{violation}");
                    result.violations.push(violation.to_string());
                }
                result.per_pair_deltas.insert(pair.pair_key(), delta);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(line = entry.line_number, error = %err, "Skipping timing pair");
                result.diagnostics.push(err.to_string());
            }
        }
    }

    match pair_delta(entry, &spec.total_time) {
        Ok(Some(delta)) => {
            if spec.total_time.exceeds(delta) {
                let violation = Violation::TotalTime {
                    line: entry.line_number,
                    delta,
                    max_latency_ms: spec.total_time.max_latency_ms,
                };
                info!(line = entry.line_number, delta, "{violation}");
                result.violations.push(violation.to_string());
            }
            result.total_time = Some(delta);
        }
        Ok(None) => {
            warn!(line = entry.line_number, "Cannot calculate total time");
            result
                .diagnostics
                .push(TimingError::MissingTotalTime.to_string());
        }
        Err(err) => {
            warn!(line = entry.line_number, error = %err, "Cannot calculate total time");
            result.diagnostics.push(err.to_string());
            result
                .diagnostics
                .push(TimingError::MissingTotalTime.to_string());
        }
    }

    result
}

/// Returns `Ok(None)` when either key is absent from the entry.
fn pair_delta(entry: &ParsedEntry, pair: &TimingPair) -> Result<Option<i64>, TimingError> {
    let (Some(start), Some(end)) = (entry.field(&pair.start_key), entry.field(&pair.end_key))
    else {
        return Ok(None);
    };

    let start = parse_millis(entry, pair, &pair.start_key, start)?;
    let end = parse_millis(entry, pair, &pair.end_key, end)?;

    end.checked_sub(start)
        .map(Some)
        .ok_or_else(|| TimingError::Overflow {
            line: entry.line_number,
            pair: pair.display_name.clone(),
        })
}

fn parse_millis(
    entry: &ParsedEntry,
    pair: &TimingPair,
    key: &str,
    value: &str,
) -> Result<i64, TimingError> {
    value
        .parse::<i64>()
        .map_err(|_| TimingError::InvalidInteger {
            line: entry.line_number,
            pair: pair.display_name.clone(),
            key: key.to_string(),
            value: value.to_string(),
        })
}
