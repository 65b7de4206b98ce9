use std::sync::Arc;

use tracing::{debug, info};

use crate::command::{CommandArgs, CommandKind, Invocation};
use crate::error::{RelayError, RelayResult};
use crate::routing::{RoutingAdapter, RoutingDaemon};
use crate::runner::{CommandRunner, SystemRunner};

/// Registry whois server queried by `whois`; `pub_whois` uses the tool default.
pub const PRIVATE_WHOIS_SERVER: &str = "whois.lantian.dn42";

const DEFAULT_RECORD_TYPE: &str = "A";

/// Executes diagnostic commands on this host.
pub struct LocalEngine {
    runner: Arc<dyn CommandRunner>,
    routing: RoutingAdapter,
}

impl LocalEngine {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let routing = RoutingAdapter::new(Arc::clone(&runner));
        Self { runner, routing }
    }

    /// Engine backed by real processes.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemRunner::new()))
    }

    /// Engine with a routing daemon fixed up front instead of probed.
    pub fn with_routing(runner: Arc<dyn CommandRunner>, daemon: RoutingDaemon) -> Self {
        let routing = RoutingAdapter::with_daemon(Arc::clone(&runner), daemon);
        Self { runner, routing }
    }

    pub async fn detect_routing(&self) -> RoutingDaemon {
        self.routing.detect().await
    }

    pub fn routing(&self) -> &RoutingAdapter {
        &self.routing
    }

    pub async fn execute_named(&self, command: &str, args: &[String]) -> RelayResult<String> {
        let kind: CommandKind = command.parse()?;
        self.execute(kind, args).await
    }

    pub async fn execute(&self, kind: CommandKind, raw_args: &[String]) -> RelayResult<String> {
        let args = CommandArgs::parse(kind, raw_args)?;

        match kind {
            CommandKind::Route => {
                let target = args.required(0, "target")?;
                info!(command = %kind, target, "running route lookup");
                self.routing.route(target, args.optional(1)).await
            }
            CommandKind::Path => {
                let target = args.required(0, "target")?;
                info!(command = %kind, target, "running AS path lookup");
                self.routing.as_paths(target, args.optional(1)).await
            }
            _ => {
                let invocation = build_invocation(&args)?;
                debug!(command = %kind, line = %invocation, "running diagnostic");
                self.runner.run(&invocation).await
            }
        }
    }
}

/// Fixed invocation for every command that does not go through the routing daemon.
pub fn build_invocation(args: &CommandArgs) -> RelayResult<Invocation> {
    let kind = args.kind();
    let invocation = match kind {
        CommandKind::Ping => Invocation::new("ping")
            .args(["-i", "0.01", "-c", "4", "-W", "1"])
            .arg(args.required(0, "target")?),
        CommandKind::Tcping => Invocation::new("tcping")
            .arg(args.required(0, "host")?)
            .arg(args.required(1, "port")?)
            .args(["-c", "4"]),
        CommandKind::Trace => Invocation::new("traceroute")
            .args(["-w", "0.5", "-N", "100"])
            .arg(args.required(0, "target")?),
        CommandKind::Whois => Invocation::new("whois")
            .args(["-h", PRIVATE_WHOIS_SERVER])
            .arg(args.required(0, "query")?),
        CommandKind::PubWhois => Invocation::new("whois").arg(args.required(0, "query")?),
        CommandKind::Dig => Invocation::new("dig")
            .arg(args.required(0, "domain")?)
            .arg(args.optional(1).unwrap_or(DEFAULT_RECORD_TYPE)),
        CommandKind::Nslookup => Invocation::new("nslookup")
            .arg(args.required(0, "domain")?)
            .arg(args.optional(1).unwrap_or(DEFAULT_RECORD_TYPE)),
        CommandKind::Route | CommandKind::Path => {
            return Err(RelayError::validation(format!(
                "{} is resolved through the routing daemon",
                kind
            )))
        }
    };
    Ok(invocation)
}
