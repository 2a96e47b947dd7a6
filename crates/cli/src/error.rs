use connectors::{ConnectionError, DriverError};
use jobconf::JobConfError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to load or save the job file: {0}")]
    JobFile(#[from] JobConfError),

    #[error("Failed to open a connection: {0}")]
    Connection(#[from] ConnectionError),

    /// The connection opened but did not behave.
    #[error("Connection check failed: {0}")]
    Driver(#[from] DriverError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Connection attempt timed out after {0}s")]
    Timeout(u64),
}
