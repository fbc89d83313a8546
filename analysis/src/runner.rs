//! Sequential and sharded analysis runs.
//!
//! [`AnalysisRunner`] consumes lines one at a time, so a log can be streamed
//! from disk without being held in memory (the finished report does retain
//! every valid entry). Each line is parsed, timed, and aggregated on its own.
//! Nothing that happens to one line stops the lines after it.
//!
//! Entries without a total time are kept in the report with their
//! diagnostics but are never handed to the [`GroupAggregator`].

use std::borrow::Cow;
use std::io::BufRead;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use perf_log_core::{AnalysisReport, EntryOutcome, GrammarSpec};

use crate::aggregate::{AggregateError, GroupAggregator};
use crate::parser::{GrammarError, LineParser, ParseIssue};
use crate::timing;

/// Errors that stop an analysis run before it starts or while reading input.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// The input could not be read.
    #[error("failed to read log input: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Incremental analysis over a stream of lines.
///
/// # Examples
///
/// ```
/// use perf_log_analysis::runner::AnalysisRunner;
/// use perf_log_core::{GrammarSpec, TimingGroup, TimingPair};
///
/// let spec = GrammarSpec::new("EVENT", ",", "=", TimingPair::new("start", "end", "Total", 100))
///     .with_timing_group(TimingGroup::new("region", "east", "East"));
/// let mut runner = AnalysisRunner::new(&spec).unwrap();
///
/// runner.feed("EVENT region=east,start=0,end=50");
/// runner.feed("not a perf line");
/// runner.feed("EVENT region=east,start=0");
///
/// let report = runner.finish();
/// assert_eq!(report.valid_count, 2);
/// assert_eq!(report.invalid_count, 1);
/// assert_eq!(report.entries.len(), 2);
/// assert_eq!(report.groups[0].stats.count, 1);
/// ```
#[derive(Debug)]
pub struct AnalysisRunner<'a> {
    spec: &'a GrammarSpec,
    parser: LineParser,
    aggregator: GroupAggregator,
    next_line: u64,
    valid_count: u64,
    invalid_count: u64,
    entries: Vec<EntryOutcome>,
}

impl<'a> AnalysisRunner<'a> {
    /// Creates a runner whose first fed line is line 1.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] if the grammar is unusable.
    pub fn new(spec: &'a GrammarSpec) -> Result<Self, GrammarError> {
        Self::starting_at(spec, 1)
    }

    /// Creates a runner whose first fed line has number `first_line`.
    ///
    /// Used when a log is split into shards so line numbers stay global.
    pub fn starting_at(spec: &'a GrammarSpec, first_line: u64) -> Result<Self, GrammarError> {
        Ok(Self {
            spec,
            parser: LineParser::new(spec)?,
            aggregator: GroupAggregator::new(&spec.timing_groups),
            next_line: first_line,
            valid_count: 0,
            invalid_count: 0,
            entries: Vec::new(),
        })
    }

    /// Processes one line.
    ///
    /// Returns the outcome for a valid line, or `None` if the line was
    /// rejected (header not found).
    pub fn feed(&mut self, line: &str) -> Option<&EntryOutcome> {
        let line_number = self.next_line;
        self.next_line += 1;

        let entry = self.parser.parse(line, line_number);
        if !entry.valid {
            self.invalid_count += 1;
            info!(line = line_number, "Log line is invalid, header not found");
            return None;
        }
        self.valid_count += 1;

        let mut timing = timing::evaluate(&entry, self.spec);
        if timing.is_aggregatable() {
            if let Err(err) = self.aggregator.update(&entry, &timing) {
                warn!(line = line_number, error = %err, "Group aggregation failed");
                timing.diagnostics.push(err.to_string());
            }
        } else {
            debug!(line = line_number, "No total time, skipping group aggregation");
        }

        self.entries.push(EntryOutcome { entry, timing });
        self.entries.last()
    }

    /// Processes one line given as raw bytes.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD and the
    /// entry, if valid, carries an `Invalid UTF-8 replaced` diagnostic.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Option<&EntryOutcome> {
        let text = String::from_utf8_lossy(bytes);
        if let Cow::Borrowed(line) = &text {
            return self.feed(line);
        }

        warn!(line = self.next_line, "Log line is not valid UTF-8, decoding lossily");
        let before = self.entries.len();
        self.feed(&text);
        if self.entries.len() == before {
            return None;
        }
        let outcome = self.entries.last_mut()?;
        outcome
            .entry
            .diagnostics
            .push(ParseIssue::InvalidUtf8.to_string());
        Some(&*outcome)
    }

    /// Number of lines fed so far, valid or not.
    pub fn lines_processed(&self) -> u64 {
        self.valid_count + self.invalid_count
    }

    /// Live view of the group statistics.
    pub fn aggregator(&self) -> &GroupAggregator {
        &self.aggregator
    }

    /// Appends the results of a runner that processed the lines directly
    /// after this one's.
    fn absorb(&mut self, other: AnalysisRunner<'_>) -> Result<(), AggregateError> {
        self.aggregator.merge(&other.aggregator)?;
        self.valid_count += other.valid_count;
        self.invalid_count += other.invalid_count;
        self.next_line = other.next_line;
        self.entries.extend(other.entries);
        Ok(())
    }

    /// Finishes the run and builds the report.
    pub fn finish(self) -> AnalysisReport {
        info!(
            valid = self.valid_count,
            invalid = self.invalid_count,
            "Completed performance analysis"
        );
        AnalysisReport {
            valid_count: self.valid_count,
            invalid_count: self.invalid_count,
            groups: self.aggregator.snapshot(),
            entries: self.entries,
        }
    }
}

/// Analyzes a sequence of lines in one pass.
///
/// # Errors
///
/// Returns a [`GrammarError`] if the grammar is unusable.
pub fn run<I, S>(lines: I, spec: &GrammarSpec) -> Result<AnalysisReport, GrammarError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut runner = AnalysisRunner::new(spec)?;
    for line in lines {
        runner.feed(line.as_ref());
    }
    Ok(runner.finish())
}

/// Analyzes a log read line by line from `reader`.
///
/// Lines that are not valid UTF-8 are decoded lossily, see
/// [`AnalysisRunner::feed_bytes`].
///
/// # Errors
///
/// Returns [`AnalysisError::Io`] if reading fails part-way, or
/// [`AnalysisError::Grammar`] for an unusable grammar.
pub fn run_reader<R: BufRead>(
    mut reader: R,
    spec: &GrammarSpec,
) -> Result<AnalysisReport, AnalysisError> {
    info!("Begin loading performance log");
    let mut runner = AnalysisRunner::new(spec)?;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        runner.feed_bytes(&buf);
    }
    info!(lines = runner.lines_processed(), "End loading performance log");
    Ok(runner.finish())
}

/// Splits a whole log into lines the way [`run_reader`] reads them.
///
/// A final line terminator does not start an extra empty line.
pub fn byte_lines(bytes: &[u8]) -> Vec<&[u8]> {
    if bytes.is_empty() {
        return Vec::new();
    }
    let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    body.split(|&b| b == b'\n').collect()
}

/// Analyzes `lines` split into `shards` contiguous chunks processed in
/// parallel.
///
/// Each chunk gets its own runner and aggregator; results are concatenated
/// in chunk order and group statistics are merged (counts and totals summed,
/// min of minimums, max of maximums). The report equals the one produced by
/// [`run`] on the same lines. Lines are fed as bytes, so non-UTF-8 input
/// is handled as in [`run_reader`].
///
/// # Errors
///
/// Returns [`AnalysisError::Grammar`] for an unusable grammar,
/// [`AnalysisError::ThreadPool`] if the worker pool cannot be created, or
/// [`AnalysisError::Aggregate`] if merged group totals overflow.
pub fn run_sharded<L>(
    lines: &[L],
    spec: &GrammarSpec,
    shards: usize,
) -> Result<AnalysisReport, AnalysisError>
where
    L: AsRef<[u8]> + Sync,
{
    let shards = shards.max(1);
    if shards == 1 || lines.len() < 2 {
        return Ok(run_bytes(lines, spec)?);
    }

    let chunk_len = lines.len().div_ceil(shards);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(shards).build()?;

    let runners: Vec<AnalysisRunner<'_>> = pool.install(|| {
        lines
            .par_chunks(chunk_len)
            .enumerate()
            .map(|(index, chunk)| {
                let first_line = (index * chunk_len) as u64 + 1;
                let mut runner = AnalysisRunner::starting_at(spec, first_line)?;
                for line in chunk {
                    runner.feed_bytes(line.as_ref());
                }
                Ok(runner)
            })
            .collect::<Result<Vec<_>, GrammarError>>()
    })?;

    let mut runners = runners.into_iter();
    let Some(mut combined) = runners.next() else {
        return Ok(run_bytes(lines, spec)?);
    };
    for runner in runners {
        combined.absorb(runner)?;
    }
    debug!(shards, chunk_len, "Merged sharded analysis");
    Ok(combined.finish())
}

fn run_bytes<L: AsRef<[u8]>>(
    lines: &[L],
    spec: &GrammarSpec,
) -> Result<AnalysisReport, GrammarError> {
    let mut runner = AnalysisRunner::new(spec)?;
    for line in lines {
        runner.feed_bytes(line.as_ref());
    }
    Ok(runner.finish())
}
