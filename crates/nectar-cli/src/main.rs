use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "nectar",
    about = "Honeypot data warehouse: cluster lifecycle and star-schema ETL",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "nectar.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init {
        /// Cluster identifier
        #[arg(long, default_value = "honeypot-dwh")]
        identifier: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Provision, tear down, or inspect the warehouse cluster
    Cluster {
        #[command(subcommand)]
        action: ClusterAction,
    },
    /// Drop and recreate warehouse tables
    Tables {
        #[command(subcommand)]
        action: TablesAction,
    },
    /// Load staging tables, build the star schema, and verify it
    Etl {
        #[command(subcommand)]
        action: EtlAction,
    },
    /// Turn raw sensor exports into staging CSV files
    Ingest {
        #[command(subcommand)]
        action: IngestAction,
    },
}

#[derive(Subcommand)]
enum ClusterAction {
    /// Create the cluster if needed and wait until it is available
    Up,
    /// Request deletion of the cluster
    Down,
    /// Describe the cluster
    Status {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
enum TablesAction {
    /// Drop then create tables
    Reset {
        /// Comma-separated table names (default: all)
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,
    },
}

#[derive(Subcommand)]
enum EtlAction {
    /// Load staging tables and run transforms, then the data-quality checks
    Run {
        /// Comma-separated table names (default: all)
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,
        /// Skip the data-quality checks
        #[arg(long)]
        skip_checks: bool,
    },
    /// Run the data-quality checks only
    Check,
}

#[derive(Subcommand)]
enum IngestAction {
    /// Normalize an hpfeeds JSON export into staging_honeypot CSV
    Honeypot { input: PathBuf, output: PathBuf },
    /// Normalize a #-delimited reputation feed into staging_reputation CSV
    Reputation { input: PathBuf, output: PathBuf },
    /// Geolocate a one-IP-per-line list into staging_ipgeo CSV (resumable)
    Geolocate { ip_list: PathBuf, output: PathBuf },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,nectar=debug"))?,
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_path();

    match cli.command {
        Commands::Init { identifier, force } => commands::init(config, &identifier, force),
        Commands::Cluster { action } => match action {
            ClusterAction::Up => commands::cluster::up(config),
            ClusterAction::Down => commands::cluster::down(config),
            ClusterAction::Status { format } => commands::cluster::status(config, &format),
        },
        Commands::Tables { action } => match action {
            TablesAction::Reset { tables } => commands::tables::reset(config, tables),
        },
        Commands::Etl { action } => match action {
            EtlAction::Run {
                tables,
                skip_checks,
            } => commands::etl::run(config, tables, skip_checks),
            EtlAction::Check => commands::etl::check(config),
        },
        Commands::Ingest { action } => match action {
            IngestAction::Honeypot { input, output } => commands::ingest::honeypot(&input, &output),
            IngestAction::Reputation { input, output } => {
                commands::ingest::reputation(&input, &output)
            }
            IngestAction::Geolocate { ip_list, output } => {
                commands::ingest::geolocate(config, &ip_list, &output)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_table_lists() {
        let cli = Cli::try_parse_from([
            "nectar",
            "--config",
            "dev.toml",
            "etl",
            "run",
            "--tables",
            "attacks,ip_locations",
            "--skip-checks",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("dev.toml"));
        match cli.command {
            Commands::Etl {
                action: EtlAction::Run {
                    tables,
                    skip_checks,
                },
            } => {
                assert_eq!(tables, vec!["attacks", "ip_locations"]);
                assert!(skip_checks);
            }
            _ => panic!("expected etl run"),
        }
    }

    #[test]
    fn tables_default_to_all() {
        let cli = Cli::try_parse_from(["nectar", "tables", "reset"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("nectar.toml"));
        assert!(matches!(
            cli.command,
            Commands::Tables {
                action: TablesAction::Reset { ref tables }
            } if tables.is_empty()
        ));
    }
}
