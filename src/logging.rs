//! Log routing for the server and the `tfd` CLI.
//!
//! Events go to stderr so CLI output on stdout can be piped. Every event is also appended,
//! without ANSI colours, to `logs/tf-digest.log` or to the file named by `TF_DIGEST_LOG_FILE`.
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Variable overriding the log file location.
pub const LOG_FILE_ENV: &str = "TF_DIGEST_LOG_FILE";

const DEFAULT_LOG_PATH: &str = "logs/tf-digest.log";

// Flushes the file writer when dropped, so it must outlive every event.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. `RUST_LOG` overrides `default_level`.
///
/// The server passes `info`; the CLI passes `warn`. A second call is a no-op.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    let path = log_file_path();
    let file_layer = match open_log_file(&path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().with_writer(writer).with_ansi(false))
        }
        Err(err) => {
            eprintln!("Logging to stderr only; cannot open {}: {err}", path.display());
            None
        }
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();
}

/// Where file logs go: `TF_DIGEST_LOG_FILE` when set and non-blank, else the default path.
pub fn log_file_path() -> PathBuf {
    std::env::var(LOG_FILE_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH))
}

/// Open `path` for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
