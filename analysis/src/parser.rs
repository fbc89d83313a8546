//! Grammar-driven log line parser.
//!
//! A log line looks like `<prefix><header><sep><key>=<value>,<key>=<value>...`
//! where the header token, the pair separator, and the field separator all
//! come from the [`GrammarSpec`]. Separators are regular expressions, so a
//! grammar may accept several delimiters (e.g. `[,;]`).
//!
//! Parsing is tolerant of partial failure: a pair that does not split into
//! exactly one non-empty key and one non-empty value is discarded with a
//! diagnostic, and the rest of the line is still used. Only a missing header
//! makes the entry invalid.
//!
//! # Examples
//!
//! ```
//! use perf_log_analysis::parser::LineParser;
//! use perf_log_core::{GrammarSpec, TimingPair};
//!
//! let spec = GrammarSpec::new("EVENT", ",", "=", TimingPair::new("start", "end", "Total", 100));
//! let parser = LineParser::new(&spec).unwrap();
//!
//! let entry = parser.parse("EVENT: a=1,b=2,c\n", 1);
//! assert!(entry.valid);
//! assert_eq!(entry.field("a"), Some("1"));
//! assert_eq!(entry.field("b"), Some("2"));
//! assert_eq!(entry.diagnostics, vec!["Invalid pair: c".to_string()]);
//! ```

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use perf_log_core::{GrammarSpec, GrammarValidationError, ParsedEntry, validate_grammar};

/// Errors raised while preparing a grammar for parsing.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// The grammar failed structural validation.
    #[error("invalid grammar: {0}")]
    Invalid(#[from] GrammarValidationError),

    /// A separator is not a valid regular expression.
    #[error("invalid {role} separator pattern '{pattern}': {source}")]
    InvalidPattern {
        role: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A problem found while parsing one line.
///
/// The `Display` text is what ends up in [`ParsedEntry::diagnostics`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIssue {
    #[error("Header not found")]
    HeaderNotFound,
    #[error("Invalid pair: {0}")]
    InvalidPair(String),
    #[error("Invalid UTF-8 replaced")]
    InvalidUtf8,
}

/// One token produced by splitting a payload on the pair separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairToken<'a> {
    /// A well-formed `key<sep>value` token.
    Field { key: &'a str, value: &'a str },
    /// A token that did not split into exactly two non-empty parts.
    Invalid(&'a str),
}

/// The pair/field micro-grammar: two compiled separator patterns.
///
/// # Examples
///
/// ```
/// use perf_log_analysis::parser::{PairGrammar, PairToken};
///
/// let grammar = PairGrammar::new("[,;]", "=").unwrap();
/// let tokens = grammar.split_pairs("a=1;b=2,=3");
/// assert_eq!(tokens[0], PairToken::Field { key: "a", value: "1" });
/// assert_eq!(tokens[1], PairToken::Field { key: "b", value: "2" });
/// assert_eq!(tokens[2], PairToken::Invalid("=3"));
/// ```
#[derive(Debug, Clone)]
pub struct PairGrammar {
    pair_separator: Regex,
    field_separator: Regex,
}

impl PairGrammar {
    /// Compiles the pair and field separator patterns.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::InvalidPattern`] if either pattern fails to
    /// compile.
    pub fn new(pair_separator: &str, field_separator: &str) -> Result<Self, GrammarError> {
        Ok(Self {
            pair_separator: compile("pair", pair_separator)?,
            field_separator: compile("field", field_separator)?,
        })
    }

    /// Splits a payload into pair tokens, in order.
    ///
    /// Empty tokens (from repeated or trailing separators) are reported as
    /// [`PairToken::Invalid`] like any other malformed token.
    pub fn split_pairs<'a>(&self, payload: &'a str) -> Vec<PairToken<'a>> {
        self.pair_separator
            .split(payload)
            .map(|token| self.split_field(token))
            .collect()
    }

    /// Splits a single token into key and value.
    pub fn split_field<'a>(&self, token: &'a str) -> PairToken<'a> {
        let parts: Vec<&str> = self.field_separator.split(token).collect();
        match parts.as_slice() {
            &[key, value] if !key.is_empty() && !value.is_empty() => {
                PairToken::Field { key, value }
            }
            _ => PairToken::Invalid(token),
        }
    }
}

fn compile(role: &'static str, pattern: &str) -> Result<Regex, GrammarError> {
    Regex::new(pattern).map_err(|source| GrammarError::InvalidPattern {
        role,
        pattern: pattern.to_string(),
        source,
    })
}

/// Parses log lines according to one grammar.
///
/// Construction validates the grammar and compiles its separators once; the
/// parser is then a pure function of `(line, line_number)`.
#[derive(Debug, Clone)]
pub struct LineParser {
    header_token: String,
    grammar: PairGrammar,
}

impl LineParser {
    /// Prepares a parser for `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::Invalid`] for the first structural problem
    /// reported by [`validate_grammar`], or
    /// [`GrammarError::InvalidPattern`] if a separator does not compile.
    pub fn new(spec: &GrammarSpec) -> Result<Self, GrammarError> {
        if let Some(err) = validate_grammar(spec).into_iter().next() {
            return Err(err.into());
        }

        Ok(Self {
            header_token: spec.header_token.clone(),
            grammar: PairGrammar::new(&spec.pair_separator, &spec.field_separator)?,
        })
    }

    /// Parses one line into an entry.
    ///
    /// `line_number` is the 1-based position of the line in its input.
    pub fn parse(&self, line: &str, line_number: u64) -> ParsedEntry {
        let raw = line.trim_end_matches(['\r', '\n']);

        let Some(index) = raw.find(&self.header_token) else {
            debug!(line = line_number, "Log line is invalid: header not found");
            return ParsedEntry::invalid(
                line_number,
                raw,
                &ParseIssue::HeaderNotFound.to_string(),
            );
        };

        let after_header = &raw[index + self.header_token.len()..];
        let payload: String = skip_one_char(after_header)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        let mut entry = ParsedEntry::new(line_number, raw);
        for token in self.grammar.split_pairs(&payload) {
            match token {
                PairToken::Field { key, value } => {
                    entry.fields.insert(key.to_string(), value.to_string());
                }
                PairToken::Invalid(token) => {
                    debug!(line = line_number, token, "Discarding invalid pair");
                    entry
                        .diagnostics
                        .push(ParseIssue::InvalidPair(token.to_string()).to_string());
                }
            }
        }

        entry
    }
}

/// Parses a single line without keeping a [`LineParser`] around.
///
/// Prefer [`LineParser`] when parsing more than one line; this compiles the
/// separators on every call.
///
/// # Errors
///
/// Returns a [`GrammarError`] if the grammar is unusable.
pub fn parse_line(
    line: &str,
    line_number: u64,
    spec: &GrammarSpec,
) -> Result<ParsedEntry, GrammarError> {
    Ok(LineParser::new(spec)?.parse(line, line_number))
}

/// Drops the separator character that follows the header token.
fn skip_one_char(text: &str) -> &str {
    let mut chars = text.chars();
    chars.next();
    chars.as_str()
}

#[cfg(test)]
mod tests {
    use perf_log_core::TimingPair;

    use super::*;

    fn spec() -> GrammarSpec {
        GrammarSpec::new("EVENT", ",", "=", TimingPair::new("start", "end", "Total", 100))
    }

    fn parser() -> LineParser {
        LineParser::new(&spec()).unwrap()
    }

    #[test]
    fn test_parse_extracts_fields_and_reports_bad_pair() {
        let entry = parser().parse("EVENT: a=1,b=2,c", 1);
        assert!(entry.valid);
        assert_eq!(entry.fields.len(), 2);
        assert_eq!(entry.field("a"), Some("1"));
        assert_eq!(entry.field("b"), Some("2"));
        assert_eq!(entry.diagnostics, vec!["Invalid pair: c".to_string()]);
    }

    #[test]
    fn test_parse_without_header_is_invalid() {
        let entry = parser().parse("INFO a=1,b=2", 7);
        assert!(!entry.valid);
        assert!(entry.fields.is_empty());
        assert_eq!(entry.diagnostics, vec!["Header not found".to_string()]);
        assert_eq!(entry.line_number, 7);
        assert_eq!(entry.raw_text, "INFO a=1,b=2");
    }

    #[test]
    fn test_parse_strips_terminator_from_raw_text() {
        let entry = parser().parse("EVENT a=1\r\n", 2);
        assert_eq!(entry.raw_text, "EVENT a=1");
        assert_eq!(entry.field("a"), Some("1"));
    }

    #[test]
    fn test_parse_discards_prefix_before_header() {
        let entry = parser().parse("2024-05-01 12:00:01 host EVENT|start=100, end=150", 1);
        assert!(entry.valid);
        assert_eq!(entry.field("start"), Some("100"));
        assert_eq!(entry.field("end"), Some("150"));
        assert!(entry.diagnostics.is_empty());
    }

    #[test]
    fn test_parse_removes_all_whitespace() {
        let entry = parser().parse("EVENT  a = 1 ,\tb\t=\t2 ", 1);
        assert_eq!(entry.field("a"), Some("1"));
        assert_eq!(entry.field("b"), Some("2"));
        assert!(entry.diagnostics.is_empty());
    }

    #[test]
    fn test_parse_duplicate_key_last_write_wins() {
        let entry = parser().parse("EVENT a=1,a=9", 1);
        assert_eq!(entry.field("a"), Some("9"));
        assert!(entry.diagnostics.is_empty());
    }

    #[test]
    fn test_parse_header_at_end_of_line_yields_empty_payload() {
        let entry = parser().parse("prefix EVENT", 1);
        assert!(entry.valid);
        assert!(entry.fields.is_empty());
        assert_eq!(entry.diagnostics, vec!["Invalid pair: ".to_string()]);
    }

    #[test]
    fn test_parse_skips_multibyte_separator_after_header() {
        let entry = parser().parse("EVENT→a=1", 1);
        assert_eq!(entry.field("a"), Some("1"));
    }

    #[test]
    fn test_parse_only_consumes_one_char_after_header() {
        // The second colon stays in the payload and corrupts the first key.
        let entry = parser().parse("EVENT::a=1,b=2", 1);
        assert_eq!(entry.field(":a"), Some("1"));
        assert_eq!(entry.field("b"), Some("2"));
    }

    #[test]
    fn test_split_pairs_repeated_separator_gives_empty_token() {
        let grammar = PairGrammar::new(",", "=").unwrap();
        let tokens = grammar.split_pairs("a=1,,b=2,");
        assert_eq!(
            tokens,
            vec![
                PairToken::Field { key: "a", value: "1" },
                PairToken::Invalid(""),
                PairToken::Field { key: "b", value: "2" },
                PairToken::Invalid(""),
            ]
        );
    }

    #[test]
    fn test_split_field_rejects_empty_sides_and_extra_parts() {
        let grammar = PairGrammar::new(",", "=").unwrap();
        assert_eq!(grammar.split_field("a="), PairToken::Invalid("a="));
        assert_eq!(grammar.split_field("=1"), PairToken::Invalid("=1"));
        assert_eq!(grammar.split_field("a=1=2"), PairToken::Invalid("a=1=2"));
        assert_eq!(grammar.split_field("a"), PairToken::Invalid("a"));
    }

    #[test]
    fn test_split_pairs_with_regex_separators() {
        let grammar = PairGrammar::new(r"\|+", "[:=]").unwrap();
        let tokens = grammar.split_pairs("a:1||b=2|c:3");
        assert_eq!(
            tokens,
            vec![
                PairToken::Field { key: "a", value: "1" },
                PairToken::Field { key: "b", value: "2" },
                PairToken::Field { key: "c", value: "3" },
            ]
        );
    }

    #[test]
    fn test_new_rejects_bad_pattern() {
        let mut spec = spec();
        spec.pair_separator = "(".to_string();
        let err = LineParser::new(&spec).unwrap_err();
        assert!(matches!(
            err,
            GrammarError::InvalidPattern { role: "pair", .. }
        ));
    }

    #[test]
    fn test_new_rejects_empty_header() {
        let mut spec = spec();
        spec.header_token = String::new();
        let err = LineParser::new(&spec).unwrap_err();
        assert!(matches!(
            err,
            GrammarError::Invalid(GrammarValidationError::EmptyHeaderToken)
        ));
    }

    #[test]
    fn test_parse_line_matches_parser() {
        let entry = parse_line("EVENT a=1", 4, &spec()).unwrap();
        assert_eq!(entry, parser().parse("EVENT a=1", 4));
    }
}
