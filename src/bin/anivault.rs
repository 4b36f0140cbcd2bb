//! AniVault server binary.
//!
//! Loads `config.toml` (or `--config PATH`), resumes any persisted schedule
//! and serves the HTTP API until Ctrl+C.
//!
//! Tracing goes to stderr and to a daily-rotated file under the data
//! directory's `logs/`.

use anivault::{Vault, VaultConfig, VaultPaths, VaultServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn config_path() -> anyhow::Result<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("{arg} requires a path"))?;
                return Ok(PathBuf::from(path));
            }
            "-V" | "--version" => {
                println!("anivault {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            other => anyhow::bail!("unrecognized argument: {other}"),
        }
    }
    Ok(VaultConfig::default_config_path())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = config_path()?;
    let config = VaultConfig::load_or_default(&path)?;
    let paths = VaultPaths::new(config.storage.resolve());
    paths.ensure()?;

    let file_appender = tracing_appender::rolling::daily(paths.logs_dir(), "anivault.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("anivault=info,tower_http=warn,hyper=warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    tracing::info!(config = %path.display(), "anivault {} starting", env!("CARGO_PKG_VERSION"));

    let vault = Arc::new(Vault::from_config(&config).map_err(|e| {
        tracing::error!(error = %e, "failed to initialise vault");
        anyhow::anyhow!("anivault failed to start: {e}")
    })?);

    if vault.resume_schedule().await {
        tracing::info!("resumed persisted auto-backup schedule");
    }

    let server = VaultServer::start(Arc::clone(&vault), &config.server).await?;
    println!("AniVault v{} on http://{}", env!("CARGO_PKG_VERSION"), server.addr());

    tokio::signal::ctrl_c().await?;
    tracing::info!("received Ctrl+C, shutting down...");

    vault.shutdown().await;
    server.stop();

    tracing::info!("anivault shut down cleanly");
    Ok(())
}
