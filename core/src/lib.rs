//! Core grammar and result types for performance log analysis.
//!
//! This crate defines the data model shared by the parsing and aggregation
//! engine and its collaborators:
//!
//! - [`GrammarSpec`]: how a log line is parsed (header token, pair and field
//!   separators) and which latencies are computed from it ([`TimingPair`],
//!   [`TimingGroup`], total time).
//! - [`ParsedEntry`]: fields extracted from one line, with parse diagnostics.
//! - [`TimingResult`]: per-pair deltas, total time, and threshold violations
//!   for one entry.
//! - [`GroupStats`] / [`GroupSummary`]: running and final latency statistics
//!   for a timing group.
//! - [`AnalysisReport`]: the outcome of analyzing a whole log.
//!
//! Validation ([`validate_grammar`]) catches structural errors such as an
//! empty header token or duplicate timing pairs.
//!
//! # Example
//!
//! ```
//! use perf_log_core::*;
//!
//! let spec = GrammarSpec::new("EVENT", ",", "=", TimingPair::new("start", "end", "Total", 100))
//!     .with_field(LogField::new("region", "Region"))
//!     .with_timing_pair(TimingPair::new("a", "b", "A-to-B", 5))
//!     .with_timing_group(TimingGroup::new("region", "east", "East"));
//!
//! assert!(validate_grammar(&spec).is_empty());
//! assert_eq!(spec.timing_pairs[0].pair_key(), "a-b");
//! ```

mod grammar;
mod types;
mod validate;

pub use grammar::{GrammarSpec, LogField, TimingGroup, TimingPair};
pub use types::*;
pub use validate::{GrammarValidationError, validate_grammar};
