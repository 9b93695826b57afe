//! shellcache host entry point.
//!
//! Installs and activates the configured generation, then resolves one
//! request per stdin line and prints one JSON report per line on stdout.
//! Logging goes to stderr to keep stdout machine-readable.

use std::sync::Arc;

use anyhow::Result;
use shellcache_client::{HttpTransport, TransportConfig};
use shellcache_core::{AppConfig, CacheWorker, Dispatcher, SqliteStorage};
use tokio::io::{AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

mod error;
mod session;

use session::Session;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        generation = %config.generation,
        strategy = ?config.strategy,
        db_path = %config.db_path.display(),
        "Starting shellcache host"
    );

    let options = config.worker_options()?;
    let storage = Arc::new(SqliteStorage::open(&config.db_path).await?);
    let transport = Arc::new(HttpTransport::new(TransportConfig::from_app_config(&config)?)?);
    let worker = CacheWorker::new(options, storage, transport);

    // A fresh host process has no clients open under an older generation.
    let session = Session::new(Dispatcher::new(worker, false), config.app_root_url()?);

    let lifecycle = session.start().await?;
    tracing::info!(
        cached = lifecycle.install.cached,
        deleted = ?lifecycle.activate.deleted,
        controls_clients = session.dispatcher().controls_clients(),
        "generation activated"
    );

    let mut stdout = tokio::io::stdout();
    let mut line = serde_json::to_vec(&lifecycle)?;
    line.push(b'\n');
    stdout.write_all(&line).await?;
    stdout.flush().await?;

    session.run(BufReader::new(tokio::io::stdin()), stdout).await?;

    Ok(())
}
