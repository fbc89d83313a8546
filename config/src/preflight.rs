//! Filesystem checks run before an analysis starts.
//!
//! Problems are collected rather than returned one at a time so a user can
//! fix a configuration in one pass.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config::AnalyzerConfig;

const WRITE_CHECK_FILE: &str = ".perf-log-analyzer-write-check";

/// A filesystem problem that would prevent a run from completing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreflightIssue {
    #[error("performance log '{}' does not exist", .0.display())]
    InputMissing(PathBuf),

    #[error("performance log '{}' is not a file", .0.display())]
    InputNotFile(PathBuf),

    #[error("performance log '{}' is not readable: {reason}", .path.display())]
    InputUnreadable { path: PathBuf, reason: String },

    #[error("results directory '{}' does not exist", .0.display())]
    ResultsDirMissing(PathBuf),

    #[error("results path '{}' is not a directory", .0.display())]
    ResultsNotDirectory(PathBuf),

    #[error("results directory '{}' is not writable: {reason}", .path.display())]
    ResultsDirNotWritable { path: PathBuf, reason: String },
}

/// Checks the configured performance log and results directory.
pub fn preflight(config: &AnalyzerConfig) -> Vec<PreflightIssue> {
    let mut issues = Vec::new();
    issues.extend(check_input(&config.perf_log.path()));
    issues.extend(check_results_dir(&config.results.directory));
    issues
}

/// Checks that `path` is an existing, readable file.
pub fn check_input(path: &Path) -> Option<PreflightIssue> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => return Some(PreflightIssue::InputMissing(path.to_path_buf())),
    };
    if !metadata.is_file() {
        return Some(PreflightIssue::InputNotFile(path.to_path_buf()));
    }
    if let Err(err) = File::open(path) {
        return Some(PreflightIssue::InputUnreadable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        });
    }
    debug!(path = %path.display(), "Performance log is readable");
    None
}

/// Checks that `dir` is an existing directory a file can be created in.
pub fn check_results_dir(dir: &Path) -> Option<PreflightIssue> {
    let metadata = match fs::metadata(dir) {
        Ok(metadata) => metadata,
        Err(_) => return Some(PreflightIssue::ResultsDirMissing(dir.to_path_buf())),
    };
    if !metadata.is_dir() {
        return Some(PreflightIssue::ResultsNotDirectory(dir.to_path_buf()));
    }

    let scratch = dir.join(WRITE_CHECK_FILE);
    match OpenOptions::new().write(true).create(true).truncate(true).open(&scratch) {
        Ok(_) => {
            if let Err(err) = fs::remove_file(&scratch) {
                debug!(
                    path = %scratch.display(),
                    error = %err,
                    "Failed to remove write check file"
                );
            }
            debug!(path = %dir.display(), "Results directory is writable");
            None
        }
        Err(err) => Some(PreflightIssue::ResultsDirNotWritable {
            path: dir.to_path_buf(),
            reason: err.to_string(),
        }),
    }
}
