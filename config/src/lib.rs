//! Configuration, preflight checks, and run sessions for the performance log
//! analyzer.
//!
//! - [`AnalyzerConfig`]: the YAML configuration file. It locates the input
//!   log and results directory and describes the log grammar.
//! - [`preflight`]: filesystem checks run before an analysis starts.
//! - [`Session`]: stamped output paths for one run.
//!
//! # Quick start
//!
//! ```no_run
//! use perf_log_config::{AnalyzerConfig, Session, preflight};
//!
//! let config = AnalyzerConfig::load("analyzer.yml").unwrap();
//! for issue in preflight(&config) {
//!     eprintln!("{issue}");
//! }
//! let session = Session::new(&config, chrono::Local::now());
//! println!("report goes to {}", session.report_path.display());
//! ```

mod config;
mod error;
mod preflight;
mod session;

pub use config::{AnalysisConfig, AnalyzerConfig, LogFormatConfig, PerfLogConfig, ResultsConfig};
pub use error::{ConfigError, Result};
pub use preflight::{PreflightIssue, check_input, check_results_dir, preflight};
pub use session::{STAMP_FORMAT, Session};
