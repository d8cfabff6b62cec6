use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("'{}' is not a valid directory", .0.display())]
    InvalidRoot(PathBuf),

    #[error("Unsupported locale '{0}'")]
    Locale(String),

    #[error("Error accessing '{}': {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl Error {
    pub fn file_access(path: &Path, source: io::Error) -> Self {
        Error::FileAccess {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Fatal errors abort a run before any file is processed. Everything else
    /// belongs to a single file and is reported without stopping the run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::Configuration(_) | Error::InvalidRoot(_) | Error::Locale(_)
        )
    }
}
