use clap::Parser;
use cronwatch_core::Config;
use cronwatch_scheduler::{AssignRequestId, Controller, Logger, Recover, WorkerPool};
use tracing::{info, warn};

mod jobs;

const DEFAULT_ADDRESS: &str = ":8998";
const DEFAULT_LOCATION: &str = "Asia/Jakarta";

/// Register a handful of sample jobs and serve the dashboard until Ctrl-C.
#[derive(Debug, Parser)]
#[command(name = "cronwatch-demo", version)]
struct Cli {
    /// Path to cronwatch.toml (defaults to ~/.cronwatch/cronwatch.toml).
    #[arg(long)]
    config: Option<String>,

    /// Dashboard bind address, overriding the config file.
    #[arg(long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cronwatch=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        Config::default()
    });
    if let Some(address) = cli.address {
        config.address = Some(address);
    }
    if config.address.is_none() {
        config.address = Some(DEFAULT_ADDRESS.to_string());
    }
    if config.location.is_none() {
        config.location = Some(DEFAULT_LOCATION.to_string());
    }

    // First interceptor runs outermost.
    let controller = Controller::builder(config)
        .interceptor(AssignRequestId)
        .interceptor(Recover)
        .interceptor(Logger)
        .interceptor(WorkerPool::default())
        .build();
    let controller = cronwatch_scheduler::init(controller)?;

    jobs::register(controller);

    let entries = controller.entries().unwrap_or_default();
    info!(
        count = entries.len(),
        jobs = %serde_json::to_string(&entries)?,
        "current jobs"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    cronwatch_scheduler::global::stop();
    Ok(())
}
