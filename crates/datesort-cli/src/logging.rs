use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_FILE: &str = "./logs/datesort.log";

struct LogSettings {
    filter: String,
    directory: PathBuf,
    file_name: String,
}

impl LogSettings {
    /// `TRACING_LEVEL` is an `EnvFilter` directive, `LOG_FILE_PATH` the file
    /// the non-ANSI copy of the log is appended to.
    fn from_env() -> Self {
        let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| DEFAULT_FILTER.to_string());
        let log_file_path = env::var("LOG_FILE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE));

        let directory = log_file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = log_file_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| "datesort.log".to_string());

        Self {
            filter,
            directory,
            file_name,
        }
    }
}

/// Terminal output goes to stderr next to the progress bars; the log file
/// gets everything the filter lets through. Keep the returned guard alive
/// until exit so the file writer flushes.
pub fn init_logger() -> WorkerGuard {
    let settings = LogSettings::from_env();
    let filter_layer = EnvFilter::try_new(&settings.filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_appender = tracing_appender::rolling::never(&settings.directory, &settings.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_target(false)
                .without_time()
                .with_ansi(true),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter_layer)
        .init();

    debug!(
        "Logging to {}",
        settings.directory.join(&settings.file_name).display()
    );

    guard
}
