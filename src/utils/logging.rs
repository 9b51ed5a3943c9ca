use std::{
    fs::{self, File, OpenOptions},
    io,
    path::Path,
    sync::Mutex,
};
use tracing_subscriber::{
    fmt::{self, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Logs go to stderr so stdout only ever carries the report. With a log
/// file, every event is also appended there without colours.
pub fn init_logging(debug: bool, log_file: Option<&Path>) -> io::Result<()> {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_timer(ChronoLocal::new(LOG_TIME_FORMAT.to_string()))
                .with_writer(Mutex::new(open_log_file(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_timer(ChronoLocal::new(LOG_TIME_FORMAT.to_string()))
                .with_writer(io::stderr),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

fn open_log_file(path: &Path) -> io::Result<File> {
    // Create log directory if it doesn't exist
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_file_parent_is_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/nested/check-cert.log");

        open_log_file(&path).unwrap();

        assert!(path.exists());
    }
}
