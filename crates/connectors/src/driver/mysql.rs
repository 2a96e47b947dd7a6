use crate::{
    connection::{Connection, DatabaseKind, MySqlConnection},
    driver::{Driver, normalize_url, supported_params, with_query_params},
    error::DriverError,
    properties::DriverProperties,
};
use async_trait::async_trait;
use mysql_async::{Conn, Opts, OptsBuilder};
use tracing::debug;

pub const DRIVER_NAMES: &[&str] = &[
    "com.mysql.jdbc.Driver",
    "com.mysql.cj.jdbc.Driver",
    "org.mariadb.jdbc.Driver",
    "mysql",
    "mariadb",
];

const SCHEMES: &[&str] = &["mysql", "mariadb"];

/// URL parameters `mysql_async::Opts::from_url` parses for a single
/// connection.
const URL_PARAMS: &[&str] = &[
    "prefer_socket",
    "socket",
    "tcp_keepalive",
    "tcp_nodelay",
    "stmt_cache_size",
    "compression",
    "max_allowed_packet",
    "wait_timeout",
    "secure_auth",
    "client_found_rows",
    "conn_ttl",
];

/// MySQL/MariaDB driver backed by a single `mysql_async` connection.
#[derive(Debug, Clone, Copy)]
pub struct MySqlDriver;

impl MySqlDriver {
    /// `mysql_async` only understands the `mysql` scheme.
    fn client_url(url: &str) -> Result<String, DriverError> {
        let url = normalize_url(url, SCHEMES).ok_or_else(|| DriverError::UnsupportedUrl {
            driver: DatabaseKind::MySql.to_string(),
            url: url.to_string(),
        })?;
        match url.split_once("://") {
            Some((_, rest)) => Ok(format!("mysql://{rest}")),
            None => Ok(url.to_string()),
        }
    }

    /// Non-credential properties travel as URL parameters; credentials go
    /// through the builder so they need no escaping.
    fn options(url: &str, properties: Option<&DriverProperties>) -> Result<Opts, DriverError> {
        let url = Self::client_url(url)?;
        let Some(props) = properties else {
            return Ok(Opts::from_url(&url)?);
        };

        let params = supported_params(&DatabaseKind::MySql, props, URL_PARAMS);
        let url = with_query_params(&url, params)?;
        let mut builder = OptsBuilder::from_opts(Opts::from_url(&url)?);
        if let Some(user) = props.user() {
            builder = builder.user(Some(user));
        }
        if let Some(password) = props.password() {
            builder = builder.pass(Some(password));
        }
        Ok(builder.into())
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::MySql
    }

    fn accepts_url(&self, url: &str) -> bool {
        normalize_url(url, SCHEMES).is_some()
    }

    async fn connect(
        &self,
        url: &str,
        properties: Option<&DriverProperties>,
    ) -> Result<Connection, DriverError> {
        let opts = Self::options(url, properties)?;
        debug!(host = %opts.ip_or_hostname(), port = opts.tcp_port(), "Connecting to MySQL");
        let conn = Conn::new(opts).await?;
        Ok(Box::new(MySqlConnection::new(conn)))
    }
}
