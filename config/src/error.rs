//! Error types for loading and checking analyzer configuration.

use thiserror::Error;

/// Errors that can occur while loading, saving, or interpreting a
/// configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// JSON serialization failure while fingerprinting the grammar.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The `log_format`/`analysis` sections do not form a usable grammar.
    /// Holds every validation message, joined with `"; "`.
    #[error("invalid grammar: {0}")]
    InvalidGrammar(String),
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
