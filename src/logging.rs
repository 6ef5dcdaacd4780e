use std::{fs::OpenOptions, path::Path, sync::Mutex};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `RAGUI_LOG=ragui=debug`
pub const LOG_ENV: &str = "RAGUI_LOG";

/// Send diagnostics to a file. The terminal belongs to the screen, so nothing goes to stderr.
pub fn init(log_file: &Path) -> crate::Result<()> {
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(crate::Error::Other)
}
