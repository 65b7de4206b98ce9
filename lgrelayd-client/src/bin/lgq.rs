//! lgq: operator front-end for the looking-glass relay.
//!
//! Runs a diagnostic on the local node or relays it to a peer listed in the
//! registry, then prints the result the way the chat front-end shows it.

use std::{io, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lgrelay_core::{CommandKind, LocalEngine};
use lgrelayd_client::{
    render::{self, render_error, render_output},
    Caller, Dispatcher, HttpTransport, PeerRegistry, DEFAULT_PEERS_FILE, PAGE_SIZE, PEERS_ENV,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lgq", version)]
#[command(about = "Run looking-glass diagnostics locally or on a peer relay")]
struct Cli {
    /// Peer registry file (or LGRELAY_PEERS, default ./peers.toml)
    #[arg(long, global = true, value_name = "FILE")]
    peers: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a diagnostic command
    Run {
        /// Target server id (defaults to this node)
        #[arg(short, long)]
        server: Option<String>,
        /// Command name, e.g. ping or route
        command: String,
        /// Command arguments
        args: Vec<String>,
    },
    /// List configured servers
    Peers {
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Server to mark as selected
        #[arg(short, long)]
        server: Option<String>,
    },
    /// List available diagnostic commands
    Commands,
    /// Show version and build information
    Version,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Version => {
            println!(
                "{}",
                lgrelay_build_info::version_report("lgq", env!("CARGO_PKG_VERSION"))
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Commands => {
            for kind in CommandKind::ALL {
                println!("{:<10} {:<28} {}", kind, kind.usage(), kind.description());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Peers { page, server } => {
            let registry = load_registry(cli.peers)?;
            let listing = registry.page(page, PAGE_SIZE);
            let selected = server.as_deref().unwrap_or(registry.local_id());
            println!("{}", render::render_page(&registry, &listing, Some(selected)));
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            server,
            command,
            args,
        } => {
            let registry = Arc::new(load_registry(cli.peers)?);
            let target = server.unwrap_or_else(|| registry.local_id().to_string());
            let transport = HttpTransport::new().context("Failed to initialise HTTP transport")?;
            let dispatcher = Dispatcher::new(
                registry,
                Arc::new(LocalEngine::system()),
                Arc::new(transport),
            );

            let caller = operator();
            match dispatcher
                .dispatch(&target, &command, &args, Some(&caller))
                .await
            {
                Ok(output) => {
                    println!("{}", render_output(&target, &output));
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    eprintln!("{}", render_error(&err));
                    Ok(ExitCode::from(1))
                }
            }
        }
    }
}

fn load_registry(flag: Option<PathBuf>) -> Result<PeerRegistry> {
    let path = flag
        .or_else(|| std::env::var_os(PEERS_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PEERS_FILE));
    PeerRegistry::load(&path)
}

fn operator() -> Caller {
    let name = std::env::var("USER").unwrap_or_else(|_| "operator".to_string());
    Caller::new("cli", name)
}
