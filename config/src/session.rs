//! Stamped output locations for one analyzer run.

use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::config::AnalyzerConfig;

/// Format of the stamp that prefixes every file written by a run.
pub const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// File locations for one analyzer run.
///
/// # Examples
///
/// ```
/// # use perf_log_config::{AnalyzerConfig, Session};
/// # use chrono::TimeZone;
/// # let yaml = r#"
/// # perf_log: { directory: ./logs, file_name: perf.log }
/// # results: { directory: ./results, app_log_file: app.log, report_file: analysis.json }
/// # log_format: { row_header: PERF, pair_separator: ",", field_separator: "=" }
/// # analysis: { total_time: { start_key: s, end_key: e, display_name: Total, max_latency_ms: 1 } }
/// # "#;
/// # let config: AnalyzerConfig = serde_yaml::from_str(yaml).unwrap();
/// let started = chrono::Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap();
/// let session = Session::new(&config, started);
/// assert_eq!(session.stamp, "20240501-123005");
/// assert!(session.report_path.ends_with("20240501-123005-analysis.json"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub started_at: DateTime<Local>,
    pub stamp: String,
    pub app_log_path: PathBuf,
    pub report_path: PathBuf,
}

impl Session {
    pub fn new(config: &AnalyzerConfig, started_at: DateTime<Local>) -> Self {
        let stamp = started_at.format(STAMP_FORMAT).to_string();
        let dir = &config.results.directory;
        Self {
            app_log_path: dir.join(format!("{stamp}-{}", config.results.app_log_file)),
            report_path: dir.join(format!("{stamp}-{}", config.results.report_file)),
            started_at,
            stamp,
        }
    }

    /// Report path with its extension replaced by `extension`.
    pub fn report_path_with_extension(&self, extension: &str) -> PathBuf {
        self.report_path.with_extension(extension)
    }
}
