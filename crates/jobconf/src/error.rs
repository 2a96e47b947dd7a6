use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobConfError {
    /// Reading or writing a job file failed.
    #[error("Failed to access job file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line in a job file is not a `key=value` entry.
    #[error("Malformed job file at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}
