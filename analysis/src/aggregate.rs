//! Streaming latency aggregation over timing groups.
//!
//! Each group definition selects entries whose field equals a given value.
//! Membership is non-exclusive: one entry may feed several groups. Only the
//! entry's total time is aggregated.

use thiserror::Error;
use tracing::debug;

use perf_log_core::{GroupStats, GroupSummary, ParsedEntry, TimingGroup, TimingResult};

/// Errors raised by [`GroupAggregator`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// The caller passed an entry whose total time is unset.
    #[error("log line #{0} has no total time and cannot be aggregated")]
    MissingTotalTime(u64),

    /// Two aggregators built from different group definitions were merged.
    #[error("cannot merge aggregators with different group definitions")]
    GroupMismatch,

    /// Adding the entry's total time would overflow a group's running total.
    #[error("log line #{line}: latency total of timing group '{group}' overflows")]
    Overflow { line: u64, group: String },

    /// Merged totals of a timing group do not fit in 64 bits.
    #[error("merged latency total of timing group '{0}' overflows")]
    MergeOverflow(String),
}

/// Running statistics for every configured timing group.
///
/// # Examples
///
/// ```
/// use perf_log_analysis::aggregate::GroupAggregator;
/// use perf_log_core::{ParsedEntry, TimingGroup, TimingResult};
///
/// let groups = vec![TimingGroup::new("region", "east", "East")];
/// let mut aggregator = GroupAggregator::new(&groups);
///
/// for total in [50, 30, 70] {
///     let mut entry = ParsedEntry::new(1, "");
///     entry.fields.insert("region".into(), "east".into());
///     let timing = TimingResult { total_time: Some(total), ..Default::default() };
///     aggregator.update(&entry, &timing).unwrap();
/// }
///
/// let east = &aggregator.snapshot()[0];
/// assert_eq!(east.stats.count, 3);
/// assert_eq!(east.stats.min_latency, Some(30));
/// assert_eq!(east.stats.max_latency, Some(70));
/// assert_eq!(east.stats.total_latency, 150);
/// assert_eq!(east.average, Some(50.0));
/// ```
#[derive(Debug, Clone)]
pub struct GroupAggregator {
    groups: Vec<(TimingGroup, GroupStats)>,
}

impl GroupAggregator {
    /// Creates an aggregator with empty statistics for each group.
    pub fn new(groups: &[TimingGroup]) -> Self {
        Self {
            groups: groups
                .iter()
                .map(|g| (g.clone(), GroupStats::default()))
                .collect(),
        }
    }

    /// Adds one entry's total time to every group it belongs to.
    ///
    /// Returns the number of groups the entry matched.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::MissingTotalTime`] if `timing` has no total
    /// time. Callers are expected to filter such entries out beforehand.
    /// Returns [`AggregateError::Overflow`] if a matching group's total would
    /// overflow; no group is updated in that case.
    pub fn update(
        &mut self,
        entry: &ParsedEntry,
        timing: &TimingResult,
    ) -> Result<usize, AggregateError> {
        let total_time = timing
            .total_time
            .ok_or(AggregateError::MissingTotalTime(entry.line_number))?;

        let mut updated = Vec::new();
        for (index, (group, stats)) in self.groups.iter().enumerate() {
            if group.matches(entry.field(&group.field_key)) {
                let mut next = *stats;
                next.record(total_time)
                    .map_err(|_| AggregateError::Overflow {
                        line: entry.line_number,
                        group: group.group_key(),
                    })?;
                updated.push((index, next));
            }
        }

        let matched = updated.len();
        for (index, next) in updated {
            self.groups[index].1 = next;
        }

        debug!(line = entry.line_number, total_time, matched, "Aggregated entry");
        Ok(matched)
    }

    /// Folds another aggregator built from the same groups into this one.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::GroupMismatch`] if the group definitions
    /// differ, or [`AggregateError::MergeOverflow`] if a combined total would
    /// overflow. `self` is unchanged on error.
    pub fn merge(&mut self, other: &GroupAggregator) -> Result<(), AggregateError> {
        if self.groups.len() != other.groups.len()
            || self
                .groups
                .iter()
                .zip(&other.groups)
                .any(|((a, _), (b, _))| a != b)
        {
            return Err(AggregateError::GroupMismatch);
        }

        let mut merged = Vec::with_capacity(self.groups.len());
        for ((group, stats), (_, other_stats)) in self.groups.iter().zip(&other.groups) {
            let mut next = *stats;
            next.merge(other_stats)
                .map_err(|_| AggregateError::MergeOverflow(group.group_key()))?;
            merged.push(next);
        }

        for ((_, stats), next) in self.groups.iter_mut().zip(merged) {
            *stats = next;
        }
        Ok(())
    }

    /// Returns the current statistics for `group_key`, if defined.
    pub fn stats(&self, group_key: &str) -> Option<&GroupStats> {
        self.groups
            .iter()
            .find(|(g, _)| g.group_key() == group_key)
            .map(|(_, s)| s)
    }

    /// Final statistics for every group, in definition order.
    pub fn snapshot(&self) -> Vec<GroupSummary> {
        self.groups
            .iter()
            .map(|(group, stats)| GroupSummary {
                group_key: group.group_key(),
                display_name: group.display_name.clone(),
                stats: *stats,
                average: stats.average(),
            })
            .collect()
    }
}
