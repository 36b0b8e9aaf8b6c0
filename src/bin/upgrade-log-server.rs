use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use upgrade_gate::{endpoint, ServerConfig, UpgradeLog};

#[derive(Parser, Debug)]
#[command(name = "upgrade-log-server")]
#[command(version, about = "Collects unsupported-browser reports into an append-only log", long_about = None)]
struct Args {
    /// Path to a YAML server configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Route the endpoint is mounted on (overrides the config file)
    #[arg(long)]
    path: Option<String>,

    /// Log file reports are appended to (overrides the config file)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Tracing filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(path) = args.path {
        anyhow::ensure!(path.starts_with('/'), "endpoint path must start with '/'");
        config.path = path;
    }
    if let Some(log_file) = args.log_file {
        config.log_file = log_file;
    }

    let app = endpoint::router(&config.path, UpgradeLog::new(&config.log_file));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .context("failed to bind report endpoint")?;

    info!(
        addr = %config.bind,
        path = %config.path,
        log_file = %config.log_file.display(),
        "report endpoint listening"
    );

    axum::serve(listener, app)
        .await
        .context("report endpoint error")?;

    Ok(())
}
