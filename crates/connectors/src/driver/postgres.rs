use crate::{
    connection::{Connection, DatabaseKind, PgConnection},
    driver::{Driver, normalize_url, supported_params, with_query_params},
    error::DriverError,
    properties::DriverProperties,
};
use async_trait::async_trait;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::{Client, Config, config::SslMode};
use tracing::{debug, error};

pub const DRIVER_NAMES: &[&str] = &["org.postgresql.Driver", "postgres", "postgresql", "pg"];

const SCHEMES: &[&str] = &["postgresql", "postgres"];

/// URL parameters `tokio_postgres::Config` parses. Credentials are set on the
/// config directly and are not listed.
const URL_PARAMS: &[&str] = &[
    "dbname",
    "options",
    "application_name",
    "sslmode",
    "host",
    "hostaddr",
    "port",
    "connect_timeout",
    "tcp_user_timeout",
    "keepalives",
    "keepalives_idle",
    "target_session_attrs",
    "channel_binding",
];

/// PostgreSQL driver backed by `tokio-postgres`, negotiating TLS from `sslmode`.
#[derive(Debug, Clone, Copy)]
pub struct PgDriver;

impl PgDriver {
    fn config(url: &str, properties: Option<&DriverProperties>) -> Result<Config, DriverError> {
        let url = normalize_url(url, SCHEMES).ok_or_else(|| DriverError::UnsupportedUrl {
            driver: DatabaseKind::Postgres.to_string(),
            url: url.to_string(),
        })?;

        let Some(props) = properties else {
            return Ok(url.parse::<Config>()?);
        };

        let params = supported_params(&DatabaseKind::Postgres, props, URL_PARAMS);
        let url = with_query_params(url, params)?;
        let mut config = url.parse::<Config>()?;
        if let Some(user) = props.user() {
            config.user(user);
        }
        if let Some(password) = props.password() {
            config.password(password);
        }
        Ok(config)
    }
}

#[async_trait]
impl Driver for PgDriver {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    fn accepts_url(&self, url: &str) -> bool {
        normalize_url(url, SCHEMES).is_some()
    }

    async fn connect(
        &self,
        url: &str,
        properties: Option<&DriverProperties>,
    ) -> Result<Connection, DriverError> {
        let config = Self::config(url, properties)?;
        let client = connect_client(config).await?;
        Ok(Box::new(PgConnection::new(client)))
    }
}

/// Makes exactly one connection. With `sslmode=prefer` (the default) the
/// server may decline TLS, and the session then continues in plaintext on the
/// same socket.
async fn connect_client(config: Config) -> Result<Client, DriverError> {
    let ssl_mode = config.get_ssl_mode();
    debug!(?ssl_mode, hosts = config.get_hosts().len(), "Connecting to Postgres");

    let mut builder = TlsConnector::builder();
    if ssl_mode == SslMode::Prefer {
        // libpq does not verify the certificate under `prefer` either.
        builder.danger_accept_invalid_certs(true);
    }
    let tls = MakeTlsConnector::new(builder.build()?);

    let (client, connection) = config.connect(tls).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(%err, "Postgres connection error");
        }
    });
    Ok(client)
}
