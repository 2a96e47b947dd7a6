use crate::error::CliError;
use connectors::{ConnectionConfig, retry::RetryPolicy};
use jobconf::ConfigStore;
use std::time::Duration;
use tracing::{error, info};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(5);

/// Opens a connection from the stored settings, checks it with `SELECT 1` and
/// closes it. Refused connections are retried up to `attempts` times; an
/// unknown driver fails on the first attempt.
pub async fn test_connection<S: ConfigStore + ?Sized>(
    config: &ConnectionConfig<'_, S>,
    attempts: usize,
    timeout: Option<Duration>,
) -> Result<(), CliError> {
    let policy = RetryPolicy::new(attempts, RETRY_BASE_DELAY, RETRY_MAX_DELAY);
    let attempt = policy.run(move || async move { config.open_connection().await });

    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, attempt)
            .await
            .map_err(|_| CliError::Timeout(limit.as_secs()))?,
        None => attempt.await,
    };

    let mut conn = result.map_err(|err| {
        let err = err.into_inner();
        error!(%err, "Connection test failed");
        CliError::Connection(err)
    })?;

    let kind = conn.kind();
    conn.ping().await.map_err(|err| {
        error!(%err, %kind, "Connection ping failed");
        CliError::Driver(err)
    })?;
    conn.close().await?;

    info!(%kind, "Connection test succeeded");
    Ok(())
}
