//! Analyzer configuration file.
//!
//! Describes where the performance log lives, where results go, how log
//! lines are structured, and which latencies to compute.
//!
//! # Example YAML
//!
//! ```yaml
//! perf_log:
//!   directory: ./logs
//!   file_name: perf.log
//! results:
//!   directory: ./results
//!   app_log_file: log_analyzer.log
//!   report_file: analysis.json
//! log_format:
//!   row_header: PERF
//!   pair_separator: ","
//!   field_separator: "="
//!   fields:
//!     - { key: region, display_name: Region }
//! analysis:
//!   timing_pairs:
//!     - { start_key: t0, end_key: t1, display_name: Queue, max_latency_ms: 50 }
//!   timing_groups:
//!     - { field_key: region, field_value: east, display_name: East }
//!   total_time: { start_key: t0, end_key: t3, display_name: Total, max_latency_ms: 500 }
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use perf_log_core::{GrammarSpec, LogField, TimingGroup, TimingPair, validate_grammar};

use crate::error::{ConfigError, Result};

/// Location of the performance log to analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfLogConfig {
    pub directory: PathBuf,
    pub file_name: String,
}

impl PerfLogConfig {
    /// Full path of the log file.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// Where the application log and the analysis report are written.
///
/// Both file names are prefixed with a session stamp at run time, see
/// [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    pub directory: PathBuf,
    pub app_log_file: String,
    pub report_file: String,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./results"),
            app_log_file: "log_analyzer.log".to_string(),
            report_file: "analysis.json".to_string(),
        }
    }
}

/// Line structure: header token, separators, and displayed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFormatConfig {
    pub row_header: String,
    /// Regular expression between key/value pairs.
    pub pair_separator: String,
    /// Regular expression between a key and its value.
    pub field_separator: String,
    /// Fields shown as columns in tabular reports.
    #[serde(default)]
    pub fields: Vec<LogField>,
}

/// Latencies to compute and how to group them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub timing_pairs: Vec<TimingPair>,
    #[serde(default)]
    pub timing_groups: Vec<TimingGroup>,
    pub total_time: TimingPair,
}

/// Top-level analyzer configuration.
///
/// # Examples
///
/// ```no_run
/// use perf_log_config::AnalyzerConfig;
///
/// let config = AnalyzerConfig::load("analyzer.yml").unwrap();
/// let grammar = config.grammar().unwrap();
/// println!("analyzing {}", config.perf_log.path().display());
/// println!("{} timing groups", grammar.timing_groups.len());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub perf_log: PerfLogConfig,
    #[serde(default)]
    pub results: ResultsConfig,
    pub log_format: LogFormatConfig,
    pub analysis: AnalysisConfig,
}

impl AnalyzerConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ConfigError::IoError) if the file cannot be read,
    /// or [`YamlError`](ConfigError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        debug!(path = %path.display(), "Loaded analyzer configuration");
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](ConfigError::IoError) if the file cannot be
    /// written, or [`YamlError`](ConfigError::YamlError) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Builds and validates the grammar described by `log_format` and
    /// `analysis`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidGrammar`](ConfigError::InvalidGrammar) listing every
    /// validation failure.
    pub fn grammar(&self) -> Result<GrammarSpec> {
        let spec = GrammarSpec {
            header_token: self.log_format.row_header.clone(),
            pair_separator: self.log_format.pair_separator.clone(),
            field_separator: self.log_format.field_separator.clone(),
            fields: self.log_format.fields.clone(),
            timing_pairs: self.analysis.timing_pairs.clone(),
            timing_groups: self.analysis.timing_groups.clone(),
            total_time: self.analysis.total_time.clone(),
        };

        let errors = validate_grammar(&spec);
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(ConfigError::InvalidGrammar(messages.join("; ")));
        }
        Ok(spec)
    }

    /// SHA-256 hex digest of the validated grammar.
    ///
    /// Two configurations that differ only in file locations share a
    /// fingerprint.
    ///
    /// # Errors
    ///
    /// Fails like [`grammar`](Self::grammar), or with
    /// [`JsonError`](ConfigError::JsonError) if serialization fails.
    pub fn grammar_fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(&self.grammar()?)?;
        let hash = Sha256::digest(&bytes);
        Ok(format!("{:x}", hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
perf_log:
  directory: ./logs
  file_name: perf.log
results:
  directory: ./out
  app_log_file: app.log
  report_file: report.md
log_format:
  row_header: PERF
  pair_separator: "[,;]"
  field_separator: "="
  fields:
    - { key: region, display_name: Region }
analysis:
  timing_pairs:
    - { start_key: t0, end_key: t1, display_name: Queue, max_latency_ms: 50 }
  timing_groups:
    - { field_key: region, field_value: east, display_name: East }
  total_time: { start_key: t0, end_key: t3, display_name: Total, max_latency_ms: 500 }
"#
    }

    fn minimal_yaml() -> &'static str {
        r#"
perf_log: { directory: /var/log/app, file_name: perf.log }
log_format: { row_header: PERF, pair_separator: ",", field_separator: "=" }
analysis:
  total_time: { start_key: start, end_key: end, display_name: Total, max_latency_ms: 100 }
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: AnalyzerConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.perf_log.path(), PathBuf::from("./logs/perf.log"));
        assert_eq!(config.results.report_file, "report.md");
        assert_eq!(config.log_format.pair_separator, "[,;]");
        assert_eq!(config.log_format.fields[0].display_name, "Region");
        assert_eq!(config.analysis.timing_pairs[0].max_latency_ms, 50);
        assert_eq!(config.analysis.timing_groups[0].field_value, "east");
    }

    #[test]
    fn test_deserialize_minimal_uses_defaults() {
        let config: AnalyzerConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(config.results, ResultsConfig::default());
        assert!(config.log_format.fields.is_empty());
        assert!(config.analysis.timing_pairs.is_empty());
        assert!(config.analysis.timing_groups.is_empty());
    }

    #[test]
    fn test_missing_section_is_rejected() {
        let yaml = "perf_log: { directory: ., file_name: perf.log }\n";
        assert!(serde_yaml::from_str::<AnalyzerConfig>(yaml).is_err());
    }

    #[test]
    fn test_grammar_copies_sections() {
        let config: AnalyzerConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        let grammar = config.grammar().unwrap();
        assert_eq!(grammar.header_token, "PERF");
        assert_eq!(grammar.total_time.pair_key(), "t0-t3");
        assert!(grammar.find_timing_pair("t0-t1").is_some());
        assert!(grammar.find_timing_group("region-east").is_some());
    }

    #[test]
    fn test_grammar_reports_every_problem() {
        let mut config: AnalyzerConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        config.log_format.row_header.clear();
        config.analysis.timing_pairs.push(config.analysis.timing_pairs[0].clone());

        let err = config.grammar().unwrap_err();
        let ConfigError::InvalidGrammar(message) = err else {
            panic!("expected InvalidGrammar, got {err:?}");
        };
        assert_eq!(message.matches("; ").count(), 1);
    }

    #[test]
    fn test_fingerprint_ignores_locations() {
        let a: AnalyzerConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        let mut b = a.clone();
        b.perf_log.directory = PathBuf::from("/elsewhere");
        b.results.directory = PathBuf::from("/tmp");

        let fingerprint = a.grammar_fingerprint().unwrap();
        assert_eq!(fingerprint.len(), 64);
        assert_eq!(fingerprint, b.grammar_fingerprint().unwrap());

        b.analysis.total_time.max_latency_ms = 501;
        assert_ne!(fingerprint, b.grammar_fingerprint().unwrap());
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyzer.yml");

        let config: AnalyzerConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        config.save(&path).unwrap();
        let loaded = AnalyzerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AnalyzerConfig::load(dir.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
