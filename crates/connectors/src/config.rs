//! Typed view over the JDBC-style connection settings kept in a job
//! configuration.
//!
//! Every setting lives under a fixed key in the wrapped [`ConfigStore`]; this
//! module only namespaces and (de)serialises values, so anything written here
//! is visible to every other holder of the same store.

use crate::{
    connection::Connection,
    driver::{DriverRegistry, redact_url},
    error::{ConnectionError, DriverError},
    properties::{DriverProperties, PASSWORD_KEY, USER_KEY},
};
use jobconf::ConfigStore;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const DRIVER_CLASS_PROPERTY: &str = "mapred.jdbc.driver.class";
pub const URL_PROPERTY: &str = "mapred.jdbc.url";
pub const USERNAME_PROPERTY: &str = "mapred.jdbc.username";
pub const PASSWORD_PROPERTY: &str = "mapred.jdbc.password";
pub const INPUT_TABLE_NAME_PROPERTY: &str = "mapred.jdbc.input.table.name";
pub const INPUT_COLUMN_NAMES_PROPERTY: &str = "mapred.jdbc.input.column.names";
pub const PRIMARY_KEY_COLUMN_PROPERTY: &str = "mapred.jdbc.primary.key.name";
pub const NUM_CHUNKS_PROPERTY: &str = "mapred.jdbc.num.chunks";
pub const MIN_ID_PROPERTY: &str = "dbmigrate.min.id";
pub const MAX_ID_PROPERTY: &str = "dbmigrate.max.id";
/// Each driver property `name` is stored under `DRIVER_PROPERTIES_PREFIX + name`.
pub const DRIVER_PROPERTIES_PREFIX: &str = "dbmigrate.driver.";

pub const DEFAULT_NUM_CHUNKS: i32 = 10;

/// Connection and input-table settings backed by a borrowed job configuration.
pub struct ConnectionConfig<'a, S: ConfigStore + ?Sized> {
    job: &'a mut S,
}

impl<'a, S: ConfigStore + ?Sized> ConnectionConfig<'a, S> {
    pub fn new(job: &'a mut S) -> Self {
        Self { job }
    }

    /// Writes driver class and URL. Credentials are only written when given,
    /// so `None` keeps whatever is already stored.
    pub fn set_connection_params(
        &mut self,
        driver_class: &str,
        url: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) {
        self.job.set(DRIVER_CLASS_PROPERTY, driver_class);
        self.job.set(URL_PROPERTY, url);

        if let Some(username) = username {
            self.job.set(USERNAME_PROPERTY, username);
        }
        if let Some(password) = password {
            self.job.set(PASSWORD_PROPERTY, password);
        }

        debug!(
            driver_class,
            url = %redact_url(url),
            username = username.is_some(),
            password = password.is_some(),
            "Configured connection parameters"
        );
    }

    pub fn configure(&mut self, driver_class: &str, url: &str) {
        self.set_connection_params(driver_class, url, None, None);
    }

    /// Opens a connection through the built-in drivers.
    pub async fn open_connection(&self) -> Result<Connection, ConnectionError> {
        self.open_connection_with(&DriverRegistry::default()).await
    }

    /// Resolves the configured driver in `registry` and makes exactly one
    /// connection attempt. Blocks until the database accepts or rejects it;
    /// there is no timeout.
    pub async fn open_connection_with(
        &self,
        registry: &DriverRegistry,
    ) -> Result<Connection, ConnectionError> {
        let driver_class = self
            .driver_class()
            .ok_or_else(|| ConnectionError::DriverLoad {
                driver: String::new(),
                reason: format!("'{DRIVER_CLASS_PROPERTY}' is not set"),
            })?;
        let driver = registry.resolve(&driver_class)?;

        let url = self.url().ok_or_else(|| ConnectionError::Connect {
            url: String::new(),
            source: DriverError::MissingUrl,
        })?;
        if !driver.accepts_url(&url) {
            let url = redact_url(&url);
            return Err(ConnectionError::Connect {
                url: url.clone(),
                source: DriverError::UnsupportedUrl {
                    driver: driver.kind().to_string(),
                    url,
                },
            });
        }
        let properties = self.driver_properties();

        info!(
            driver = %driver_class,
            kind = %driver.kind(),
            url = %redact_url(&url),
            with_properties = properties.is_some(),
            "Opening database connection"
        );

        driver
            .connect(&url, properties.as_ref())
            .await
            .map_err(|source| ConnectionError::Connect {
                url: redact_url(&url),
                source,
            })
    }

    pub fn driver_class(&self) -> Option<String> {
        self.job.get(DRIVER_CLASS_PROPERTY)
    }

    pub fn url(&self) -> Option<String> {
        self.job.get(URL_PROPERTY)
    }

    pub fn username(&self) -> Option<String> {
        self.job.get(USERNAME_PROPERTY)
    }

    pub fn password(&self) -> Option<String> {
        self.job.get(PASSWORD_PROPERTY)
    }

    pub fn input_table_name(&self) -> Option<String> {
        self.job.get(INPUT_TABLE_NAME_PROPERTY)
    }

    pub fn set_input_table_name(&mut self, table_name: &str) {
        self.job.set(INPUT_TABLE_NAME_PROPERTY, table_name);
    }

    pub fn input_column_names(&self) -> Option<Vec<String>> {
        self.job.get_strings(INPUT_COLUMN_NAMES_PROPERTY)
    }

    /// Column names are stored comma-delimited, so a name must be non-empty
    /// and free of commas. A single empty name would be stored as `""` and
    /// read back as an empty list.
    pub fn set_input_column_names<C: AsRef<str>>(&mut self, column_names: &[C]) {
        let names: Vec<&str> = column_names.iter().map(|c| c.as_ref()).collect();
        debug_assert!(
            names.iter().all(|name| !name.contains(',')),
            "column names must not contain ','"
        );
        debug_assert!(
            names.iter().all(|name| !name.is_empty()),
            "column names must not be empty"
        );
        self.job.set_strings(INPUT_COLUMN_NAMES_PROPERTY, &names);
    }

    pub fn primary_key_column(&self) -> Option<String> {
        self.job.get(PRIMARY_KEY_COLUMN_PROPERTY)
    }

    pub fn set_primary_key_column(&mut self, key: &str) {
        self.job.set(PRIMARY_KEY_COLUMN_PROPERTY, key);
    }

    pub fn num_chunks(&self) -> i32 {
        self.job.get_i32_or(NUM_CHUNKS_PROPERTY, DEFAULT_NUM_CHUNKS)
    }

    pub fn set_num_chunks(&mut self, num_chunks: i32) {
        self.job.set_i32(NUM_CHUNKS_PROPERTY, num_chunks);
    }

    /// Every stored number, -1 included, comes back as `Some`. `None` means
    /// the key is absent or holds something that is not an integer; the
    /// latter is logged as a warning by the store.
    pub fn min_id(&self) -> Option<i64> {
        self.job.get_i64(MIN_ID_PROPERTY)
    }

    pub fn set_min_id(&mut self, id: i64) {
        self.job.set_i64(MIN_ID_PROPERTY, id);
    }

    pub fn max_id(&self) -> Option<i64> {
        self.job.get_i64(MAX_ID_PROPERTY)
    }

    pub fn set_max_id(&mut self, id: i64) {
        self.job.set_i64(MAX_ID_PROPERTY, id);
    }

    /// Adds every entry under the driver-property prefix. Properties already
    /// stored and missing from `properties` are kept.
    pub fn set_driver_properties<I, K, V>(&mut self, properties: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in properties {
            self.add_driver_property(key.as_ref(), value.as_ref());
        }
    }

    pub fn add_driver_property(&mut self, key: &str, value: &str) {
        debug_assert!(!key.is_empty(), "driver property name must not be empty");
        self.job
            .set(&format!("{DRIVER_PROPERTIES_PREFIX}{key}"), value);
    }

    /// Prefixed driver properties merged with the stored credentials under
    /// `user` and `password`. The credential keys win over driver properties
    /// of the same name. `None` when there is nothing to pass at all, which
    /// tells the driver to connect with the URL alone.
    pub fn driver_properties(&self) -> Option<DriverProperties> {
        let mut props: DriverProperties = self
            .job
            .entries_with_prefix(DRIVER_PROPERTIES_PREFIX)
            .into_iter()
            .collect();

        if let Some(username) = self.username() {
            props.insert(USER_KEY, username);
        }
        if let Some(password) = self.password() {
            props.insert(PASSWORD_KEY, password);
        }

        (!props.is_empty()).then_some(props)
    }

    /// Printable snapshot of the settings with secrets masked.
    pub fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            driver_class: self.driver_class(),
            url: self.url().map(|url| redact_url(&url)),
            username: self.username(),
            password_set: self.job.contains(PASSWORD_PROPERTY),
            input_table_name: self.input_table_name(),
            input_column_names: self.input_column_names(),
            primary_key_column: self.primary_key_column(),
            num_chunks: self.num_chunks(),
            min_id: self.min_id(),
            max_id: self.max_id(),
            driver_properties: self
                .driver_properties()
                .map(|props| props.redacted())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSummary {
    pub driver_class: Option<String>,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password_set: bool,
    pub input_table_name: Option<String>,
    pub input_column_names: Option<Vec<String>>,
    pub primary_key_column: Option<String>,
    pub num_chunks: i32,
    pub min_id: Option<i64>,
    pub max_id: Option<i64>,
    pub driver_properties: BTreeMap<String, String>,
}
