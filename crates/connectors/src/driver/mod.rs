use crate::{
    connection::{Connection, DatabaseKind},
    error::{ConnectionError, DriverError},
    properties::DriverProperties,
};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tracing::warn;
use url::Url;

pub mod mysql;
pub mod postgres;

const JDBC_PREFIX: &str = "jdbc:";

/// Opens connections for one family of databases.
#[async_trait]
pub trait Driver: Send + Sync {
    fn kind(&self) -> DatabaseKind;

    fn accepts_url(&self, url: &str) -> bool;

    /// Connects with the URL alone when `properties` is `None`, otherwise with
    /// the URL and the given property set.
    async fn connect(
        &self,
        url: &str,
        properties: Option<&DriverProperties>,
    ) -> Result<Connection, DriverError>;
}

/// Maps driver class names and short aliases to drivers.
#[derive(Clone)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// A registry with nothing registered.
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, driver: Arc<dyn Driver>) {
        self.drivers.insert(name.into(), driver);
    }

    /// Looks a driver up by exact name first, then case-insensitively.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Driver>, ConnectionError> {
        let name = name.trim();
        self.drivers
            .get(name)
            .or_else(|| self.drivers.get(&name.to_lowercase()))
            .cloned()
            .ok_or_else(|| ConnectionError::DriverLoad {
                driver: name.to_string(),
                reason: "no driver registered under this name".to_string(),
            })
    }

}

impl Default for DriverRegistry {
    /// The MySQL and Postgres drivers under their JDBC class names and aliases.
    fn default() -> Self {
        let mut registry = DriverRegistry::new();

        let mysql: Arc<dyn Driver> = Arc::new(mysql::MySqlDriver);
        for name in mysql::DRIVER_NAMES {
            registry.register(*name, Arc::clone(&mysql));
        }

        let postgres: Arc<dyn Driver> = Arc::new(postgres::PgDriver);
        for name in postgres::DRIVER_NAMES {
            registry.register(*name, Arc::clone(&postgres));
        }

        registry
    }
}

/// Strips a leading `jdbc:` and returns the URL if its scheme is one of
/// `schemes`.
pub(crate) fn normalize_url<'a>(url: &'a str, schemes: &[&str]) -> Option<&'a str> {
    let url = url.trim();
    let url = url.strip_prefix(JDBC_PREFIX).unwrap_or(url);
    let (scheme, rest) = url.split_once("://")?;
    if rest.is_empty() {
        return None;
    }
    schemes
        .iter()
        .any(|s| s.eq_ignore_ascii_case(scheme))
        .then_some(url)
}

/// Non-credential properties whose names are in `supported`. Every other
/// property is dropped with a warning; the client crates reject unknown URL
/// parameters, while a JDBC driver would ignore them.
pub(crate) fn supported_params<'a>(
    kind: &DatabaseKind,
    properties: &'a DriverProperties,
    supported: &[&str],
) -> Vec<(&'a str, &'a str)> {
    properties
        .without_credentials()
        .filter(|(key, _)| {
            let known = supported.contains(key);
            if !known {
                warn!(%kind, property = *key, "Skipping driver property the client does not support");
            }
            known
        })
        .collect()
}

/// Appends `params` to the URL's query string. The URL is returned untouched
/// when there is nothing to add.
pub(crate) fn with_query_params<'a, I>(url: &str, params: I) -> Result<String, DriverError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut params = params.into_iter().peekable();
    if params.peek().is_none() {
        return Ok(url.to_string());
    }

    let mut parsed = Url::parse(url).map_err(|e| DriverError::InvalidUrl(e.to_string()))?;
    parsed.query_pairs_mut().extend_pairs(params);
    Ok(parsed.to_string())
}

/// URL safe for logs and error messages: an embedded password is masked.
pub fn redact_url(url: &str) -> String {
    let trimmed = url.trim();
    let (prefix, rest) = match trimmed.strip_prefix(JDBC_PREFIX) {
        Some(rest) => (JDBC_PREFIX, rest),
        None => ("", trimmed),
    };

    match Url::parse(rest) {
        Ok(mut parsed) if parsed.password().is_some() => {
            // Only fails for URLs that cannot carry credentials at all.
            if parsed.set_password(Some("***")).is_err() {
                return trimmed.to_string();
            }
            format!("{prefix}{parsed}")
        }
        _ => trimmed.to_string(),
    }
}
