use crate::{commands::Commands, error::CliError};
use clap::Parser;
use connectors::ConnectionConfig;
use jobconf::JobConf;
use std::{path::PathBuf, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod error;
mod output;

#[derive(Parser)]
#[command(
    name = "dbconf",
    version = "0.1.0",
    about = "Manage JDBC connection settings of migration jobs"
)]
struct Cli {
    #[arg(long, global = true, default_value = "job.conf", help = "Job file path")]
    job: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Initialize logger
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut job = JobConf::load_or_default(&cli.job)?;

    match cli.command {
        Commands::Configure(args) => {
            let mut config = ConnectionConfig::new(&mut job);
            args.apply(&mut config);
            job.save(&cli.job)?;
            info!(path = %cli.job.display(), entries = job.len(), "Job file updated");
        }
        Commands::Show { json } => {
            let config = ConnectionConfig::new(&mut job);
            output::print_summary(&config.summary(), json)?;
        }
        Commands::TestConn {
            attempts,
            timeout_secs,
        } => {
            let config = ConnectionConfig::new(&mut job);
            conn::test_connection(&config, attempts, timeout_secs.map(Duration::from_secs))
                .await?;
        }
    }

    Ok(())
}
