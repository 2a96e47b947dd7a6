use clap::{Args, Subcommand};
use connectors::ConnectionConfig;
use jobconf::ConfigStore;

#[derive(Subcommand)]
pub enum Commands {
    /// Write connection and input settings into the job file
    Configure(ConfigureArgs),

    /// Print the settings stored in the job file
    Show {
        #[arg(long, help = "Print the settings as JSON")]
        json: bool,
    },

    /// Open a connection from the job file settings, ping it and close it
    TestConn {
        #[arg(long, default_value_t = 1, help = "Connection attempts before giving up")]
        attempts: usize,

        #[arg(long, help = "Give up when no connection is made within this many seconds")]
        timeout_secs: Option<u64>,
    },
}

#[derive(Args, Debug, Default)]
pub struct ConfigureArgs {
    /// Driver class name or alias, e.g. "org.postgresql.Driver" or "mysql"
    #[arg(long, requires = "url")]
    pub driver: Option<String>,

    /// Connection URL, e.g. "jdbc:postgresql://localhost:5432/testdb"
    #[arg(long, requires = "driver")]
    pub url: Option<String>,

    #[arg(long, requires = "driver")]
    pub user: Option<String>,

    #[arg(long, requires = "driver")]
    pub password: Option<String>,

    #[arg(long, help = "Input table name")]
    pub table: Option<String>,

    #[arg(long, value_delimiter = ',', help = "Comma-separated input columns")]
    pub columns: Option<Vec<String>>,

    #[arg(long)]
    pub primary_key: Option<String>,

    #[arg(long, help = "Number of chunks the id range is split into")]
    pub chunks: Option<i32>,

    #[arg(long, allow_negative_numbers = true)]
    pub min_id: Option<i64>,

    #[arg(long, allow_negative_numbers = true)]
    pub max_id: Option<i64>,

    /// Driver property as key=value; repeatable
    #[arg(long = "property", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,
}

impl ConfigureArgs {
    /// Writes every given option; options left out keep their stored value.
    pub fn apply<S: ConfigStore + ?Sized>(&self, config: &mut ConnectionConfig<'_, S>) {
        if let (Some(driver), Some(url)) = (&self.driver, &self.url) {
            config.set_connection_params(
                driver,
                url,
                self.user.as_deref(),
                self.password.as_deref(),
            );
        }
        if let Some(table) = &self.table {
            config.set_input_table_name(table);
        }
        if let Some(columns) = &self.columns {
            config.set_input_column_names(columns);
        }
        if let Some(key) = &self.primary_key {
            config.set_primary_key_column(key);
        }
        if let Some(chunks) = self.chunks {
            config.set_num_chunks(chunks);
        }
        if let Some(min_id) = self.min_id {
            config.set_min_id(min_id);
        }
        if let Some(max_id) = self.max_id {
            config.set_max_id(max_id);
        }
        config.set_driver_properties(self.properties.iter().map(|(k, v)| (k, v)));
    }
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty property name in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
