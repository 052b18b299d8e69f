use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sunex_checkpoint::{CheckpointStore, FileCheckpointStore};
use sunex_config::{ExporterConfig, LoadedConfig};
use sunex_db::{NoopRecorder, PgRecorder, Recorder};
use sunex_reconcile::PlausibilityLimits;
use sunex_runner::Runner;
use sunex_sampler::{BridgeConfig, HttpBridgeSampler};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "sunex")]
#[command(about = "Solar counter exporter CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// One-shot export run: load checkpoint, sample, reconcile, record.
    Run {
        /// Layered config paths in merge order (base -> site -> overrides)
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },

    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Checkpoint utilities
    Checkpoint {
        #[command(subcommand)]
        cmd: CheckpointCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations (creates the measurements table when absent).
    Migrate,
}

#[derive(Subcommand)]
enum CheckpointCmd {
    /// Print the persisted checkpoint document.
    Show {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Run { config_paths } => {
            let loaded = load_config(&config_paths)?;
            info!(config_hash = %loaded.config_hash, "starting export run");

            let runner = build_runner(&loaded.config).await?;
            match runner.run().await {
                Ok(report) => {
                    println!("run_ok=true");
                    println!("counter={}", report.counter_name);
                    println!("value={}", report.value);
                    if let Some(delta) = report.delta {
                        println!("delta={delta}");
                    }
                    println!("readings_stored={}", report.readings_stored);
                    println!("inserted_at={}", report.inserted_at.to_rfc3339());
                    println!("recorder={}", report.recorder);
                    println!("config_hash={}", loaded.config_hash);
                }
                Err(e) => {
                    error!(code = e.code(), "export run failed: {e}");
                    println!("run_failed=true code={}", e.code());
                    return Err(e.into());
                }
            }
        }

        Commands::Db { cmd } => {
            let pool = sunex_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = sunex_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_measurements_table={}",
                        s.ok, s.has_measurements_table
                    );
                }
                DbCmd::Migrate => {
                    sunex_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::Checkpoint { cmd } => match cmd {
            CheckpointCmd::Show { config_paths } => {
                let loaded = load_config(&config_paths)?;
                let store = FileCheckpointStore::new(&loaded.config.checkpoint.path);
                let (checkpoint, found) = store.load()?;

                println!("checkpoint_path={}", loaded.config.checkpoint.path.display());
                println!("checkpoint_found={found}");
                println!("{}", serde_json::to_string(&checkpoint)?);
            }
        },

        Commands::ConfigHash { paths } => {
            let loaded = load_config(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    sunex_config::load_layered_yaml(&path_refs)
}

/// Wire collaborators from config. The recorder toggle swaps in the noop
/// recorder; disabled runs still advance the checkpoint.
async fn build_runner(config: &ExporterConfig) -> Result<Runner> {
    let sampler = HttpBridgeSampler::new(BridgeConfig {
        base_url: config.device.bridge_url.clone(),
        register: config.device.register.clone(),
        unit_id: config.device.unit_id,
        counter_name: config.device.name.clone(),
        unit: config.device.unit.clone(),
        timeout: Duration::from_secs(config.device.timeout_secs),
    })
    .context("building bridge sampler")?;

    let checkpoints = FileCheckpointStore::new(&config.checkpoint.path);

    let recorder: Box<dyn Recorder> = if config.recorder.enable {
        let pool = sunex_db::connect_from_env().await?;
        Box::new(PgRecorder::new(pool))
    } else {
        info!("recorder disabled, readings will not be stored");
        Box::new(NoopRecorder)
    };

    let limits = PlausibilityLimits::new(
        config.limits.max_delta_wh,
        Duration::from_secs(config.limits.window_secs),
    );

    Ok(Runner::new(
        Box::new(sampler),
        Box::new(checkpoints),
        recorder,
        limits,
    ))
}
