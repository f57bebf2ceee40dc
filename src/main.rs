use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dubworks::config::Config;
use dubworks::pipeline::PipelineEngine;
use dubworks::queue::{run_worker_loop, JobQueue};
use dubworks::server::{self, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dubworks")]
#[command(version, about = "Durable video dubbing pipeline: ASR, translation, TTS and subtitle burn-in")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API and an embedded worker pool.
    Serve {
        #[arg(long, default_value = "8080")]
        port: u16,
    },
    /// Run only the worker pool, claiming jobs from the queue.
    Worker,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();
}

async fn spawn_workers(config: &Config, queue: Arc<JobQueue>) -> Result<()> {
    let engine = Arc::new(PipelineEngine::new(config.clone()).context("failed to build pipeline engine")?);
    for worker_id in 0..config.worker_concurrency {
        let queue = queue.clone();
        let engine = engine.clone();
        let lease_secs = config.job_lease_secs;
        tokio::spawn(async move {
            info!(worker_id, "worker started");
            run_worker_loop(queue, engine, lease_secs, Duration::from_secs(2)).await;
        });
    }
    Ok(())
}

/// Periodically reclaims jobs whose lease expired without a heartbeat (§4.6),
/// so a crashed worker's job returns to `queued` within a bounded time.
fn spawn_lease_sweeper(queue: Arc<JobQueue>, lease_secs: i64) {
    let interval = Duration::from_secs((lease_secs / 2).max(1) as u64);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match queue.sweep_expired_leases().await {
                Ok(0) => {}
                Ok(n) => info!(reclaimed = n, "swept expired job leases"),
                Err(e) => warn!(error = %e, "lease sweep failed"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = Config::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .context("failed to create upload directory")?;

    let queue = Arc::new(
        JobQueue::connect(&config.database_url)
            .await
            .context("failed to connect to job queue")?,
    );

    match cli.command {
        Command::Serve { port } => {
            spawn_workers(&config, queue.clone()).await?;
            spawn_lease_sweeper(queue.clone(), config.job_lease_secs);

            let state = AppState {
                queue,
                upload_dir: config.upload_dir.clone(),
            };
            let app = server::router(state);
            let addr = format!("0.0.0.0:{port}");
            info!(%addr, "serving");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await?;
        }
        Command::Worker => {
            spawn_workers(&config, queue.clone()).await?;
            spawn_lease_sweeper(queue, config.job_lease_secs);
            info!("worker pool running, press Ctrl+C to stop");
            tokio::signal::ctrl_c().await?;
        }
    }

    Ok(())
}
