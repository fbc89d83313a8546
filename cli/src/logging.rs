//! Console and application-log setup.
//!
//! Console output goes to stderr so rendered reports can be piped from
//! stdout. The filter defaults to `info` and honors `RUST_LOG`.

use std::fs::File;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global subscriber.
///
/// When `app_log` is set, events are also written to that file through a
/// non-blocking writer. The returned guard flushes the file on drop and
/// must be held until the program exits.
pub fn init_logging(app_log: Option<&Path>) -> Result<Option<WorkerGuard>, String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let (file_layer, guard) = match app_log {
        Some(path) => {
            let file = File::create(path).map_err(|err| {
                format!("Failed to create application log '{}': {err}", path.display())
            })?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|err| format!("Failed to initialize logging: {err}"))?;

    Ok(guard)
}
