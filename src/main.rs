use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use broker_importer::config::{Config, Credentials};
use broker_importer::constants;
use broker_importer::logging;
use broker_importer::pipeline::{ImportOptions, ImportPipeline, VerificationReporter};
use broker_importer::storage::{BrokerStore, InMemoryStore, SupabaseStore};

#[derive(Parser)]
#[command(name = "broker_importer")]
#[command(about = "Imports broker comparison CSVs into the brokers database")]
#[command(version = "0.1.0")]
struct Cli {
    /// Optional TOML file with table names and the verification watch list
    #[arg(long, global = true, default_value = constants::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read CSV files and upsert brokers, features and regulation rows
    Import {
        /// CSV files, processed in the order given
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Use an in-memory store instead of the database
        #[arg(long)]
        dry_run: bool,
        /// Skip the verification pass after upserting
        #[arg(long)]
        skip_verify: bool,
        /// Also write the normalized brokers as JSON into this directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Check the watch list against the database without importing
    Verify,
}

fn connect(config: &Config) -> anyhow::Result<Arc<dyn BrokerStore>> {
    let credentials = Credentials::from_env()?;
    info!("Connecting to {}", credentials.url);
    let store = SupabaseStore::new(
        &credentials,
        config.tables.clone(),
        Duration::from_secs(config.supabase.timeout_seconds),
    )?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenv::dotenv().ok();
    let _guard = logging::init_logging()?;
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Import {
            files,
            dry_run,
            skip_verify,
            output_dir,
        } => {
            println!("🔄 Running broker import...");

            let store: Arc<dyn BrokerStore> = if dry_run {
                warn!("Dry run: writing to an in-memory store");
                Arc::new(InMemoryStore::new())
            } else {
                connect(&config)?
            };

            let options = ImportOptions {
                verify: !skip_verify,
                watch_list: config.verify.watch_list.clone(),
                output_dir,
            };

            let summary = ImportPipeline::new(store, options)
                .run(&files)
                .await
                .map_err(|e| {
                    error!("Import failed: {}", e);
                    e
                })?;

            summary.print();
            if let Some(report) = &summary.verification {
                report.print();
            }

            let failures = summary.upsert.failure_count();
            if failures > 0 {
                warn!("{} upsert failures during import", failures);
                println!("\n⚠️  Completed with {} failures", failures);
            } else {
                println!("\n✅ Import completed successfully");
            }
        }
        Commands::Verify => {
            let store = connect(&config)?;
            let report = VerificationReporter::new(store, config.verify.watch_list.clone())
                .run()
                .await;
            report.print();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_requires_files() {
        assert!(Cli::try_parse_from(["broker_importer", "import"]).is_err());
    }

    #[test]
    fn test_import_flags_parse() {
        let cli = Cli::try_parse_from([
            "broker_importer",
            "import",
            "a.csv",
            "b.csv",
            "--dry-run",
            "--config",
            "custom.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        match cli.command {
            Commands::Import { files, dry_run, skip_verify, .. } => {
                assert_eq!(files.len(), 2);
                assert!(dry_run);
                assert!(!skip_verify);
            }
            Commands::Verify => panic!("expected import"),
        }
    }
}
