use crate::retry::RetryDisposition;
use thiserror::Error;

/// Failures raised by a concrete driver while establishing a connection.
#[derive(Debug, Error)]
pub enum DriverError {
    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// The URL could not be turned into MySQL connection options.
    #[error("Invalid MySQL URL: {0}")]
    MySqlUrl(#[from] mysql_async::UrlError),

    /// PostgreSQL driver error, including URL parse failures.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The driver does not handle the URL's scheme.
    #[error("URL is not supported by the {driver} driver: {url}")]
    UnsupportedUrl { driver: String, url: String },

    #[error("No connection URL configured")]
    MissingUrl,

    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

/// Errors surfaced by [`ConnectionConfig::open_connection`](crate::config::ConnectionConfig::open_connection).
///
/// The two kinds stay distinct so callers can fail fast on a bad driver name
/// and retry a refused connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Unable to load connection driver '{driver}': {reason}")]
    DriverLoad { driver: String, reason: String },

    #[error("Unable to create connection to '{url}': {source}")]
    Connect {
        /// Connection URL with any embedded password masked.
        url: String,
        #[source]
        source: DriverError,
    },
}

impl ConnectionError {
    pub fn disposition(&self) -> RetryDisposition {
        match self {
            ConnectionError::DriverLoad { .. } => RetryDisposition::Stop,
            ConnectionError::Connect { .. } => RetryDisposition::Retry,
        }
    }
}
