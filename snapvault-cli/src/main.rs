/*!
Snapvault CLI - takes one point-in-time backup of the configured collections.

Designed to be invoked by an external scheduler (cron, systemd timers). Exit
status is 0 on success; otherwise the diagnostic names the failing stage and
the status identifies it.
*/

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use snapvault_core::config::DEFAULT_BACKUP_DIR;
use snapvault_core::observability::{init_observability, SnapvaultMetrics};
use snapvault_core::{
    create_engine_from_config, BackupConfig, CollectionDescriptor, SnapvaultError,
};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "snapvault")]
#[command(about = "Point-in-time backups of remote data collections")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot every configured collection into the backup directory
    Run(RunArgs),
    /// Print the collections a run would capture
    Collections {
        /// Comma-separated collection names (defaults to the built-in set)
        #[arg(long, env = "SNAPVAULT_COLLECTIONS")]
        collections: Option<String>,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Base URL of the remote store
    #[arg(long, env = "SNAPVAULT_STORE_URL")]
    store_url: String,

    /// Service credential with read access to every row
    #[arg(long, env = "SNAPVAULT_SERVICE_KEY", hide_env_values = true)]
    service_key: String,

    /// Hex-encoded 32-byte key; archives are unencrypted when absent
    #[arg(long, env = "BACKUP_ENCRYPTION_KEY", hide_env_values = true)]
    encryption_key: Option<String>,

    /// Directory receiving the dated archive and the latest alias
    #[arg(long, env = "SNAPVAULT_BACKUP_DIR", default_value = DEFAULT_BACKUP_DIR)]
    backup_dir: PathBuf,

    /// Comma-separated collection names (defaults to the built-in set)
    #[arg(long, env = "SNAPVAULT_COLLECTIONS")]
    collections: Option<String>,

    /// Fail instead of writing an unencrypted archive when no key is set
    #[arg(long)]
    require_encryption: bool,

    /// Per-request timeout for remote fetches, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Write Prometheus text metrics to this file after the run
    #[arg(long)]
    metrics_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    if let Err(e) = init_observability(cli.json_logs, level) {
        eprintln!("Error ({}): {e}", e.stage());
        return ExitCode::from(exit_status(e.exit_code()));
    }

    let result = match cli.command {
        Commands::Run(args) => run_backup(args).await,
        Commands::Collections { collections } => list_collections(collections.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<SnapvaultError>() {
                Some(snapvault_error) => error!(
                    stage = snapvault_error.stage(),
                    error = %snapvault_error,
                    "Backup failed"
                ),
                None => error!(error = %format!("{e:#}"), "Backup failed"),
            }
            ExitCode::from(failure_code(&e))
        }
    }
}

/// Exit status for a failed command; errors outside the taxonomy map to 1
fn failure_code(e: &anyhow::Error) -> u8 {
    e.downcast_ref::<SnapvaultError>()
        .map_or(1, |snapvault_error| exit_status(snapvault_error.exit_code()))
}

fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

fn resolve_collections(list: Option<&str>) -> Result<Vec<CollectionDescriptor>, SnapvaultError> {
    match list {
        Some(list) if !list.trim().is_empty() => CollectionDescriptor::parse_list(list),
        _ => Ok(CollectionDescriptor::defaults()),
    }
}

fn build_config(args: &RunArgs) -> Result<BackupConfig, SnapvaultError> {
    let mut config = BackupConfig::new(args.store_url.clone(), args.service_key.clone())
        .with_backup_dir(args.backup_dir.clone())
        .with_collections(resolve_collections(args.collections.as_deref())?);

    if let Some(key) = &args.encryption_key {
        config = config.with_encryption_key(key.clone());
    }
    config.require_encryption = args.require_encryption;
    config.request_timeout = args.timeout_secs.map(Duration::from_secs);

    Ok(config)
}

async fn run_backup(args: RunArgs) -> Result<(), anyhow::Error> {
    let config = build_config(&args)?;
    let engine = create_engine_from_config(&config)?;

    let outcome = engine.run().await;

    // Written for failed runs too; a metrics failure never masks the run's outcome.
    if let Some(path) = &args.metrics_file {
        if let Err(e) = write_metrics(path) {
            warn!(error = %format!("{e:#}"), "Skipping metrics file");
        }
    }

    let report = outcome?;
    info!(
        path = %report.path.display(),
        latest = %report.latest_path.display(),
        size_bytes = report.size_bytes,
        encrypted = report.encrypted,
        "Backup written"
    );
    println!("{}", format_report(&report));
    Ok(())
}

fn write_metrics(path: &Path) -> Result<(), anyhow::Error> {
    let metrics = SnapvaultMetrics::global().gather_metrics()?;
    std::fs::write(path, metrics)
        .with_context(|| format!("failed to write metrics to {}", path.display()))
}

fn format_report(report: &snapvault_core::PublishReport) -> String {
    format!(
        "backup written: {} ({} bytes, {}, sha256 {})",
        report.path.display(),
        report.size_bytes,
        if report.encrypted { "encrypted" } else { "unencrypted" },
        report.sha256
    )
}

fn list_collections(list: Option<&str>) -> Result<(), anyhow::Error> {
    for descriptor in resolve_collections(list)? {
        println!("{descriptor}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec![
            "snapvault",
            "run",
            "--store-url",
            "https://store.example.co",
            "--service-key",
            "service-key",
        ];
        argv.extend_from_slice(extra);

        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_config_defaults() {
        let config = build_config(&run_args(&[])).unwrap();

        assert_eq!(config.backup_dir, PathBuf::from(DEFAULT_BACKUP_DIR));
        assert_eq!(config.collections, CollectionDescriptor::defaults());
        assert!(config.request_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_build_config_overrides() {
        let config = build_config(&run_args(&[
            "--backup-dir",
            "/tmp/snapvault",
            "--collections",
            "weeks,user_settings",
            "--require-encryption",
            "--timeout-secs",
            "30",
        ]))
        .unwrap();

        assert_eq!(config.backup_dir, PathBuf::from("/tmp/snapvault"));
        assert_eq!(config.collections.len(), 2);
        assert!(config.require_encryption);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_collection_list_is_configuration_error() {
        let error = build_config(&run_args(&["--collections", "weeks,bad name"])).unwrap_err();
        assert_eq!(error.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_unwritable_metrics_file_keeps_fetch_exit_code() {
        let args = match Cli::try_parse_from([
            "snapvault",
            "run",
            "--store-url",
            "http://127.0.0.1:9",
            "--service-key",
            "service-key",
            "--collections",
            "weeks",
            "--timeout-secs",
            "5",
            "--metrics-file",
            "/nonexistent-snapvault-dir/metrics.prom",
        ])
        .unwrap()
        .command
        {
            Commands::Run(args) => args,
            _ => panic!("Expected run command"),
        };

        let error = run_backup(args).await.unwrap_err();

        assert!(matches!(
            error.downcast_ref::<SnapvaultError>(),
            Some(SnapvaultError::Fetch { .. })
        ));
        assert_eq!(failure_code(&error), 3);
    }

    #[test]
    fn test_failure_code_mapping() {
        let configuration = anyhow::Error::from(SnapvaultError::configuration("bad log filter"));
        assert_eq!(failure_code(&configuration), 2);

        let write = anyhow::Error::from(SnapvaultError::write("/backups", "disk full"));
        assert_eq!(failure_code(&write), 6);

        assert_eq!(failure_code(&anyhow::anyhow!("unexpected")), 1);
    }
}
