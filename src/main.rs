// src/main.rs
//
// HTTP service: accepts CSV/Excel uploads, stores their analysis summaries
// and serves them back by id.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use data_analyzer::config::{default_config_template, Config, LogFormat, LoggingConfig};
use data_analyzer::server::{router, serve, AppState};

#[derive(Parser)]
#[command(name = "data-analyzer")]
#[command(about = "Upload tabular files and get statistics and cleaning summaries back")]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(long, short, env = "DATA_ANALYZER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(long, short)]
    port: Option<u16>,

    /// Print a default configuration file and exit
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.generate_config {
        print!("{}", default_config_template());
        return Ok(());
    }

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config.logging);

    let state = AppState::from_config(&config.storage).context("failed to open storage")?;
    let app = router(Arc::new(state), config.server.max_upload_bytes);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    serve(listener, app).await?;
    Ok(())
}

/// RUST_LOG wins over the configured level when set.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
