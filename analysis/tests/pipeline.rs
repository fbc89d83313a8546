use std::fs;
use std::io::BufReader;
use std::path::PathBuf;

use perf_log_analysis::output::{OutputFormat, format_document};
use perf_log_analysis::report::{AnalysisDocument, RunInfo};
use perf_log_analysis::runner::{run, run_reader, run_sharded};
use perf_log_analysis::{GrammarError, analyze_lines};
use perf_log_core::{
    AnalysisReport, GrammarSpec, GrammarValidationError, LogField, TimingGroup, TimingPair,
};

fn checkout_spec() -> GrammarSpec {
    GrammarSpec::new("PERF", ",", "=", TimingPair::new("start", "end", "Total", 100))
        .with_field(LogField::new("region", "Region"))
        .with_field(LogField::new("kind", "Kind"))
        .with_timing_pair(TimingPair::new("start", "parsed", "Parse", 3))
        .with_timing_pair(TimingPair::new("parsed", "stored", "Store", 10))
        .with_timing_group(TimingGroup::new("region", "east", "East"))
        .with_timing_group(TimingGroup::new("region", "west", "West"))
        .with_timing_group(TimingGroup::new("kind", "read", "Reads"))
}

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(path).expect("fixture file must be readable")
}

fn analyze_fixture() -> AnalysisReport {
    analyze_lines(fixture("checkout.log").lines(), &checkout_spec())
        .expect("fixture grammar should be usable")
}

#[test]
fn test_fixture_counts_valid_and_invalid_lines() {
    let report = analyze_fixture();
    assert_eq!(report.valid_count, 7);
    assert_eq!(report.invalid_count, 2);
    assert_eq!(report.total_count(), 9);

    let lines: Vec<u64> = report.entries.iter().map(|o| o.entry.line_number).collect();
    assert_eq!(lines, vec![2, 3, 5, 6, 7, 8, 9]);
}

#[test]
fn test_fixture_deltas_are_exact() {
    let report = analyze_fixture();
    let first = &report.entries[0];
    assert_eq!(first.timing.per_pair_deltas["start-parsed"], 4);
    assert_eq!(first.timing.per_pair_deltas["parsed-stored"], 6);
    assert_eq!(first.timing.total_time, Some(50));
}

#[test]
fn test_fixture_violations() {
    let report = analyze_fixture();
    assert_eq!(report.violation_count(), 3);

    assert_eq!(
        report.entries[0].timing.violations,
        vec!["On log line #2, Parse (start -> parsed) delta of 4 ms exceeds max allowed (3 ms)"]
    );
    assert_eq!(
        report.entries[1].timing.violations,
        vec!["On log line #3, Store (parsed -> stored) delta of 23 ms exceeds max allowed (10 ms)"]
    );
    // A delta equal to the maximum is not a violation.
    assert_eq!(report.entries[3].timing.per_pair_deltas["start-parsed"], 3);
    assert!(report.entries[3].timing.violations.is_empty());

    let last = report.entries.last().unwrap();
    assert_eq!(
        last.timing.violations,
        vec!["On log line #9, total time of 400 ms exceeds max allowed (100 ms)"]
    );
}

#[test]
fn test_fixture_entries_without_total_time() {
    let report = analyze_fixture();

    let no_end = &report.entries[3];
    assert_eq!(no_end.entry.line_number, 6);
    assert_eq!(no_end.timing.total_time, None);
    assert_eq!(no_end.timing.diagnostics, vec!["cannot calculate total time"]);

    let bad_end = &report.entries[5];
    assert_eq!(bad_end.entry.line_number, 8);
    assert_eq!(bad_end.timing.total_time, None);
    assert_eq!(bad_end.timing.diagnostics.len(), 2);
    assert!(bad_end.timing.diagnostics[0].contains("'abc'"));
    assert_eq!(bad_end.timing.diagnostics[1], "cannot calculate total time");
}

#[test]
fn test_fixture_bad_pairs_keep_entry_valid() {
    let report = analyze_fixture();
    let last = report.entries.last().unwrap();
    assert!(last.entry.valid);
    assert_eq!(
        last.entry.diagnostics,
        vec![
            "Invalid pair: region=west;kind=write".to_string(),
            "Invalid pair: orphan".to_string(),
        ]
    );
    assert_eq!(last.entry.field("region"), None);
    assert_eq!(last.entry.field("start"), Some("7000"));
}

#[test]
fn test_fixture_group_statistics() {
    let report = analyze_fixture();
    assert_eq!(report.groups.len(), 3);

    let east = &report.groups[0];
    assert_eq!(east.group_key, "region-east");
    assert_eq!(east.stats.count, 3);
    assert_eq!(east.stats.min_latency, Some(30));
    assert_eq!(east.stats.max_latency, Some(70));
    assert_eq!(east.stats.total_latency, 150);
    assert_eq!(east.average, Some(50.0));

    let west = &report.groups[1];
    assert_eq!(west.stats.count, 1);
    assert_eq!(west.average, Some(20.0));

    // Group membership is not exclusive.
    let reads = &report.groups[2];
    assert_eq!(reads.stats.count, 3);
    assert_eq!(reads.stats.total_latency, 140);
}

#[test]
fn test_group_bounds_enclose_average() {
    let report = analyze_fixture();
    for group in report.groups.iter().filter(|g| g.stats.count > 0) {
        let min = group.stats.min_latency.unwrap() as f64;
        let max = group.stats.max_latency.unwrap() as f64;
        let avg = group.average.unwrap();
        assert!(min <= avg && avg <= max, "{}", group.group_key);
    }
}

#[test]
fn test_invalid_lines_have_no_fields() {
    let spec = checkout_spec();
    let report = run(["no header here", "PERF region=east"], &spec).unwrap();
    assert_eq!(report.invalid_count, 1);
    assert!(report.entries.iter().all(|o| o.entry.valid));
    assert!(
        report
            .entries
            .iter()
            .flat_map(|o| o.entry.fields.keys())
            .all(|k| !k.is_empty())
    );
}

#[test]
fn test_reader_and_sharded_runs_agree_with_lines() {
    let text = fixture("checkout.log");
    let spec = checkout_spec();
    let from_lines = analyze_lines(text.lines(), &spec).unwrap();

    let from_reader = run_reader(BufReader::new(text.as_bytes()), &spec).unwrap();
    assert_eq!(from_reader, from_lines);

    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    let sharded = run_sharded(&lines, &spec, 3).unwrap();
    assert_eq!(sharded, from_lines);
}

#[test]
fn test_empty_header_token_is_rejected() {
    let mut spec = checkout_spec();
    spec.header_token.clear();
    let err = analyze_lines(["PERF start=0,end=1"], &spec).unwrap_err();
    assert!(matches!(
        err,
        GrammarError::Invalid(GrammarValidationError::EmptyHeaderToken)
    ));
}

#[test]
fn test_bad_separator_pattern_is_rejected() {
    let mut spec = checkout_spec();
    spec.pair_separator = "[".to_string();
    let err = analyze_lines(["PERF start=0,end=1"], &spec).unwrap_err();
    assert!(matches!(err, GrammarError::InvalidPattern { .. }));
}

#[test]
fn test_markdown_document_for_fixture() {
    let spec = checkout_spec();
    let document = AnalysisDocument {
        run_info: RunInfo::new("0.1.0", "20240501-120000").with_input("checkout.log"),
        report: analyze_fixture(),
    };

    let markdown = format_document(&document, &spec, OutputFormat::Markdown).unwrap();
    assert!(markdown.starts_with("# Analysis Results"));
    assert!(markdown.contains("## Analysis Summary"));
    assert!(markdown.contains("## Analysis Log"));
    assert!(markdown.contains("| Region | Kind |"));
    assert!(markdown.contains("checkout.log"));

    let json = format_document(&document, &spec, OutputFormat::Json).unwrap();
    let parsed: AnalysisDocument = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.run_info, document.run_info);
    assert_eq!(parsed.report.entries, document.report.entries);
    assert_eq!(parsed.report.groups[0], document.report.groups[0]);
}
