use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::EnvFilter;

use crate::error::TelemetryError;

/// Environment variable holding the log filter, e.g. `BREATHR_LOG=debug`.
pub const LOG_ENV: &str = "BREATHR_LOG";

static INIT_GUARD: OnceLock<Result<(), TelemetryError>> = OnceLock::new();

/// Installs the global subscriber, appending to the log file at `path`.
///
/// The terminal belongs to the TUI, so nothing is ever written to stdout or
/// stderr. Only the first call in a process does anything; later calls
/// return the first outcome.
pub fn init_tracing(path: &Path) -> Result<(), TelemetryError> {
    INIT_GUARD.get_or_init(|| install(path)).clone()
}

fn install(path: &Path) -> Result<(), TelemetryError> {
    let file = open_log(path).map_err(|err| TelemetryError::LogFile {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|_| TelemetryError::AlreadyInitialised)
}

fn open_log(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
