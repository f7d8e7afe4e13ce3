use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::paths::log_file_path;

/// Routes `tracing` output to the log file; the terminal belongs to the TUI.
///
/// Logging is best effort: if the file cannot be opened the subscriber is
/// simply not installed.
pub fn init() {
    let Ok(path) = log_file_path() else {
        return;
    };
    if let Some(parent) = path.parent()
        && fs::create_dir_all(parent).is_err()
    {
        return;
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ureq=warn,rustls=warn"));
    let _ = tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_env_filter(filter)
        .with_ansi(false)
        .try_init();

    tracing::info!(log = %path.display(), "podgrid starting");
}
