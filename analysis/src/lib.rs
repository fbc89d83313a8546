//! Grammar-driven performance log parsing and latency aggregation.
//!
//! This crate turns raw log lines into an [`AnalysisReport`]. The pipeline
//! has four stages, each usable on its own:
//!
//! - [`parser`]: splits a line into fields using the header token and the
//!   pair/field separator patterns of a [`GrammarSpec`].
//! - [`timing`]: computes per-pair deltas and the total time of an entry and
//!   flags deltas over their configured maximum.
//! - [`aggregate`]: keeps min/max/average total time per timing group.
//! - [`runner`]: drives the three stages over a stream of lines, isolating
//!   per-line failures, optionally across parallel shards.
//!
//! [`output`] renders the finished report; [`report`] holds the run metadata
//! written alongside it.
//!
//! # Example
//!
//! ```
//! use perf_log_analysis::analyze_lines;
//! use perf_log_core::{GrammarSpec, TimingGroup, TimingPair};
//!
//! let spec = GrammarSpec::new("EVENT", ",", "=", TimingPair::new("start", "end", "Total", 100))
//!     .with_timing_pair(TimingPair::new("a", "b", "A-to-B", 5))
//!     .with_timing_group(TimingGroup::new("region", "east", "East"));
//!
//! let log = "\
//! EVENT: region=east,start=0,end=50,a=1,b=2
//! EVENT: region=east,start=0,end=30
//! heartbeat
//! EVENT: region=east,start=0,end=70,a=10,b=20
//! ";
//!
//! let report = analyze_lines(log.lines(), &spec).unwrap();
//! assert_eq!(report.valid_count, 3);
//! assert_eq!(report.invalid_count, 1);
//! assert_eq!(report.violation_count(), 1);
//! assert_eq!(report.groups[0].average, Some(50.0));
//! ```
//!
//! The engine performs no file or console I/O of its own; it only emits
//! [`tracing`] events for invalid lines, violations, and missing total times.
//!
//! [`AnalysisReport`]: perf_log_core::AnalysisReport
//! [`GrammarSpec`]: perf_log_core::GrammarSpec

pub mod aggregate;
pub mod output;
pub mod parser;
pub mod report;
pub mod runner;
pub mod timing;

use perf_log_core::{AnalysisReport, GrammarSpec};

pub use parser::GrammarError;
pub use runner::{AnalysisError, AnalysisRunner};

/// Analyzes a sequence of lines with the given grammar.
///
/// Shorthand for [`runner::run`].
///
/// # Errors
///
/// Returns a [`GrammarError`] if the grammar is unusable.
pub fn analyze_lines<I, S>(lines: I, spec: &GrammarSpec) -> Result<AnalysisReport, GrammarError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    runner::run(lines, spec)
}
