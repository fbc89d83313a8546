//! Grammar validation.
//!
//! Checks the structural invariants a [`GrammarSpec`] must satisfy before it
//! is handed to the parser: a non-empty header token and separators, and
//! unique field, timing-pair, and timing-group keys.
//!
//! Separator patterns are only checked for emptiness here; whether they are
//! valid regular expressions is decided when the parser compiles them.
//!
//! # Examples
//!
//! ```
//! use perf_log_core::*;
//!
//! let spec = GrammarSpec::new("PERF", ",", "=", TimingPair::new("t0", "t3", "Total", 500));
//! assert!(validate_grammar(&spec).is_empty());
//!
//! let bad = GrammarSpec::new("", ",", "=", TimingPair::new("t0", "t3", "Total", 500));
//! assert_eq!(validate_grammar(&bad), vec![GrammarValidationError::EmptyHeaderToken]);
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{GrammarSpec, TimingPair};

/// Grammar validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarValidationError {
    /// Header token is empty or whitespace-only.
    #[error("header token cannot be empty")]
    EmptyHeaderToken,
    /// Pair separator pattern is empty.
    #[error("pair separator cannot be empty")]
    EmptyPairSeparator,
    /// Field separator pattern is empty.
    #[error("field separator cannot be empty")]
    EmptyFieldSeparator,
    /// A field, pair, or group definition has an empty key.
    #[error("empty key in {0} definition")]
    EmptyKey(&'static str),
    /// Two field definitions share a key.
    #[error("duplicate field key: {0}")]
    DuplicateField(String),
    /// Two timing pairs share a `start-end` key.
    #[error("duplicate timing pair: {0}")]
    DuplicateTimingPair(String),
    /// Two timing groups share a `field-value` key.
    #[error("duplicate timing group: {0}")]
    DuplicateTimingGroup(String),
}

/// Validates a grammar, returning every problem found.
///
/// An empty result means the grammar is usable.
pub fn validate_grammar(spec: &GrammarSpec) -> Vec<GrammarValidationError> {
    let mut errors = Vec::new();

    if spec.header_token.trim().is_empty() {
        errors.push(GrammarValidationError::EmptyHeaderToken);
    }
    if spec.pair_separator.is_empty() {
        errors.push(GrammarValidationError::EmptyPairSeparator);
    }
    if spec.field_separator.is_empty() {
        errors.push(GrammarValidationError::EmptyFieldSeparator);
    }

    let mut seen_fields: HashSet<&str> = HashSet::new();
    for field in &spec.fields {
        if field.key.trim().is_empty() {
            errors.push(GrammarValidationError::EmptyKey("field"));
        } else if !seen_fields.insert(field.key.as_str()) {
            errors.push(GrammarValidationError::DuplicateField(field.key.clone()));
        }
    }

    let mut seen_pairs = HashSet::new();
    for pair in &spec.timing_pairs {
        if has_empty_key(pair) {
            errors.push(GrammarValidationError::EmptyKey("timing pair"));
        } else if !seen_pairs.insert(pair.pair_key()) {
            errors.push(GrammarValidationError::DuplicateTimingPair(pair.pair_key()));
        }
    }

    if has_empty_key(&spec.total_time) {
        errors.push(GrammarValidationError::EmptyKey("total time"));
    }

    let mut seen_groups = HashSet::new();
    for group in &spec.timing_groups {
        if group.field_key.trim().is_empty() {
            errors.push(GrammarValidationError::EmptyKey("timing group"));
        } else if !seen_groups.insert(group.group_key()) {
            errors.push(GrammarValidationError::DuplicateTimingGroup(
                group.group_key(),
            ));
        }
    }

    errors
}

fn has_empty_key(pair: &TimingPair) -> bool {
    pair.start_key.trim().is_empty() || pair.end_key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use crate::{LogField, TimingGroup};

    use super::*;

    fn base() -> GrammarSpec {
        GrammarSpec::new("PERF", ",", "=", TimingPair::new("t0", "t3", "Total", 500))
    }

    #[test]
    fn test_validate_accepts_complete_grammar() {
        let spec = base()
            .with_field(LogField::new("region", "Region"))
            .with_timing_pair(TimingPair::new("t0", "t1", "Queue", 50))
            .with_timing_pair(TimingPair::new("t1", "t2", "Work", 200))
            .with_timing_group(TimingGroup::new("region", "east", "East"))
            .with_timing_group(TimingGroup::new("region", "west", "West"));
        assert!(validate_grammar(&spec).is_empty());
    }

    #[test]
    fn test_validate_rejects_duplicate_pairs() {
        let spec = base()
            .with_timing_pair(TimingPair::new("t0", "t1", "Queue", 50))
            .with_timing_pair(TimingPair::new("t0", "t1", "Queue again", 60));
        assert_eq!(
            validate_grammar(&spec),
            vec![GrammarValidationError::DuplicateTimingPair(
                "t0-t1".to_string()
            )]
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_fields_and_groups() {
        let spec = base()
            .with_field(LogField::new("region", "Region"))
            .with_field(LogField::new("region", "Area"))
            .with_timing_group(TimingGroup::new("region", "east", "East"))
            .with_timing_group(TimingGroup::new("region", "east", "Also east"));
        assert_eq!(
            validate_grammar(&spec),
            vec![
                GrammarValidationError::DuplicateField("region".to_string()),
                GrammarValidationError::DuplicateTimingGroup("region-east".to_string()),
            ]
        );
    }

    #[test]
    fn test_validate_rejects_empty_separators_and_keys() {
        let mut spec = GrammarSpec::new("PERF", "", "", TimingPair::new("", "t3", "Total", 5));
        spec.timing_pairs.push(TimingPair::new("t0", " ", "Broken", 5));

        let errors = validate_grammar(&spec);
        assert_eq!(
            errors,
            vec![
                GrammarValidationError::EmptyPairSeparator,
                GrammarValidationError::EmptyFieldSeparator,
                GrammarValidationError::EmptyKey("timing pair"),
                GrammarValidationError::EmptyKey("total time"),
            ]
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            GrammarValidationError::DuplicateField("a".to_string()).to_string(),
            "duplicate field key: a"
        );
        assert_eq!(
            GrammarValidationError::EmptyKey("timing group").to_string(),
            "empty key in timing group definition"
        );
    }
}
