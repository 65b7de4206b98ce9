use std::{io, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use lgrelay_core::{LocalEngine, SystemRunner};
use lgrelayd::config::{self, CliRelaydOptions, SECRET_ENV};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DAEMON_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "lgrelayd", version)]
#[command(about = "Looking-glass relay: runs signed diagnostic requests from peer nodes")]
struct Cli {
    /// Port to listen on (default 65534)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Address to bind (default 0.0.0.0)
    #[arg(long)]
    host: Option<String>,

    /// Shared secret used to verify request signatures (or LGRELAY_SECRET)
    #[arg(long = "keys", visible_alias = "secret", value_name = "SECRET")]
    keys: Option<String>,

    /// HTTP path of the run endpoint (default /api/run)
    #[arg(long, value_name = "PATH")]
    run_path: Option<String>,

    /// Relay configuration file (TOML, [relayd] table)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Routing daemon: auto, frr, bird or none
    #[arg(long, value_name = "DAEMON")]
    routing: Option<String>,

    /// Accept repeated signatures inside the validity window
    #[arg(long)]
    allow_replay: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    info!(
        "{}",
        lgrelay_build_info::formatted_banner("lgrelayd", DAEMON_VERSION)
    );

    let config_path = config::config_path(cli.config.as_deref());
    let file_config = config::load_file_config(config_path.as_deref())?;
    let options = CliRelaydOptions {
        host: cli.host,
        port: cli.port,
        run_path: cli.run_path,
        secret: cli.keys,
        allow_replay: cli.allow_replay,
        routing: cli.routing,
    };
    let relay_config = config::resolve(
        &options,
        std::env::var(SECRET_ENV).ok(),
        file_config.as_ref(),
    )
    .context("Invalid relay configuration")?;

    if relay_config.secret.is_some() {
        info!("[Runner] Signature mode enabled");
    } else {
        warn!("[Runner] Signature mode disabled: no shared secret, every request will be rejected");
    }
    if !relay_config.replay_protection {
        warn!("[Runner] Replay protection disabled");
    }

    let runner = Arc::new(SystemRunner::new());
    let engine = match relay_config.routing {
        Some(daemon) => LocalEngine::with_routing(runner, daemon),
        None => LocalEngine::new(runner),
    };
    let daemon = engine.detect_routing().await;
    info!(routing = %daemon, "routing backend ready");

    lgrelayd::run_http_server(&relay_config, Arc::new(engine)).await
}
