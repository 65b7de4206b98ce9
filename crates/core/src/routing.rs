//! Routing-daemon detection and daemon-specific lookup commands.
//!
//! The host runs FRRouting (`vtysh`), BIRD (`birdc`) or neither. Detection
//! happens once per process behind a `OnceCell`; callers that arrive while
//! the probes are still running wait on the same cell instead of probing
//! again.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::command::Invocation;
use crate::error::{RelayError, RelayResult};
use crate::runner::CommandRunner;

const NO_BACKEND_MESSAGE: &str = "No routing software detected.";

static AS_PATH_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"BGP\.as_path:\s+(.*)").expect("AS path pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingDaemon {
    Frr,
    Bird,
    #[serde(rename = "none")]
    Unavailable,
}

impl RoutingDaemon {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingDaemon::Frr => "frr",
            RoutingDaemon::Bird => "bird",
            RoutingDaemon::Unavailable => "none",
        }
    }
}

impl fmt::Display for RoutingDaemon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which table a lookup reads: the RIB (`route`) or the BGP table (`bgp`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupType {
    Route,
    Bgp,
}

impl LookupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupType::Route => "route",
            LookupType::Bgp => "bgp",
        }
    }
}

fn frr_probe() -> Invocation {
    Invocation::new("vtysh").arg("-c").arg("show version")
}

fn bird_probe() -> Invocation {
    Invocation::new("birdc").args(["show", "status"])
}

pub struct RoutingAdapter {
    runner: Arc<dyn CommandRunner>,
    state: OnceCell<RoutingDaemon>,
}

impl RoutingAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            state: OnceCell::new(),
        }
    }

    /// Adapter whose daemon is already known; no probe will ever run.
    pub fn with_daemon(runner: Arc<dyn CommandRunner>, daemon: RoutingDaemon) -> Self {
        Self {
            runner,
            state: OnceCell::new_with(Some(daemon)),
        }
    }

    /// Resolve the installed daemon, probing on first call only.
    pub async fn detect(&self) -> RoutingDaemon {
        *self
            .state
            .get_or_init(|| probe(self.runner.as_ref()))
            .await
    }

    /// The resolved daemon, or `None` while detection has not finished.
    pub fn resolved(&self) -> Option<RoutingDaemon> {
        self.state.get().copied()
    }

    pub async fn lookup_invocation(
        &self,
        target: &str,
        lookup: LookupType,
        port: Option<&str>,
    ) -> RelayResult<Invocation> {
        let daemon = self.detect().await;
        build_lookup(daemon, target, lookup, port)
    }

    /// Generic route lookup, raw daemon output.
    pub async fn route(&self, target: &str, port: Option<&str>) -> RelayResult<String> {
        let invocation = self
            .lookup_invocation(target, LookupType::Route, port)
            .await?;
        self.runner.run(&invocation).await
    }

    /// BGP lookup reduced to the distinct AS paths it mentions.
    pub async fn as_paths(&self, target: &str, port: Option<&str>) -> RelayResult<String> {
        let invocation = self.lookup_invocation(target, LookupType::Bgp, port).await?;
        let raw = self.runner.run(&invocation).await?;
        Ok(extract_as_paths(&raw))
    }
}

async fn probe(runner: &dyn CommandRunner) -> RoutingDaemon {
    let daemon = match runner.run(&frr_probe()).await {
        Ok(_) => RoutingDaemon::Frr,
        Err(err) => {
            debug!(error = %err, "vtysh probe failed");
            match runner.run(&bird_probe()).await {
                Ok(_) => RoutingDaemon::Bird,
                Err(err) => {
                    debug!(error = %err, "birdc probe failed");
                    RoutingDaemon::Unavailable
                }
            }
        }
    };
    info!(daemon = %daemon, "routing software detected");
    daemon
}

/// Build the daemon-specific lookup for `target`.
///
/// FRR takes an alternate instance as `-P <port>` before the subcommand;
/// birdc is pointed at it through an environment override instead.
pub fn build_lookup(
    daemon: RoutingDaemon,
    target: &str,
    lookup: LookupType,
    port: Option<&str>,
) -> RelayResult<Invocation> {
    match daemon {
        RoutingDaemon::Frr => {
            let family = if target.contains(':') { "ipv6" } else { "ip" };
            let mut invocation = Invocation::new("sudo").arg("vtysh");
            if let Some(port) = port {
                invocation = invocation.arg("-P").arg(port);
            }
            Ok(invocation
                .arg("-c")
                .arg(format!("show {} {} {}", family, lookup.as_str(), target)))
        }
        RoutingDaemon::Bird => {
            let mut invocation = Invocation::new("birdc");
            if let Some(port) = port {
                invocation = invocation.env("BIRDC", format!("birdc -s {}", port));
            }
            Ok(invocation.args(["show", "route", "for", target, "all"]))
        }
        RoutingDaemon::Unavailable => {
            Err(RelayError::BackendUnavailable(NO_BACKEND_MESSAGE.to_string()))
        }
    }
}

/// Distinct `BGP.as_path` values in first-seen order, one per line.
/// Falls back to the raw output when no line carries the attribute.
pub fn extract_as_paths(raw: &str) -> String {
    let mut paths: Vec<&str> = Vec::new();
    for line in raw.lines() {
        if let Some(captures) = AS_PATH_LINE.captures(line) {
            let path = captures.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    let joined = paths.join("\n");
    if joined.is_empty() {
        raw.to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frr_selects_ipv6_syntax_only_for_colon_targets() {
        let v4 = build_lookup(RoutingDaemon::Frr, "172.20.0.53", LookupType::Route, None).unwrap();
        assert_eq!(v4.program(), "sudo");
        assert_eq!(v4.argv(), &["vtysh", "-c", "show ip route 172.20.0.53"]);
        assert!(!v4.command_line().contains("ipv6"));

        let v6 = build_lookup(RoutingDaemon::Frr, "fd42:d42::1", LookupType::Bgp, None).unwrap();
        assert_eq!(v6.argv(), &["vtysh", "-c", "show ipv6 bgp fd42:d42::1"]);
    }

    #[test]
    fn frr_port_is_a_flag_before_the_subcommand() {
        let inv = build_lookup(RoutingDaemon::Frr, "10.0.0.0/8", LookupType::Route, Some("2605"))
            .unwrap();
        assert_eq!(
            inv.argv(),
            &["vtysh", "-P", "2605", "-c", "show ip route 10.0.0.0/8"]
        );
        assert!(inv.env_overrides().is_empty());
    }

    #[test]
    fn bird_port_is_an_environment_override() {
        let plain = build_lookup(RoutingDaemon::Bird, "10.0.0.1", LookupType::Bgp, None).unwrap();
        assert_eq!(plain.program(), "birdc");
        assert_eq!(plain.argv(), &["show", "route", "for", "10.0.0.1", "all"]);
        assert!(plain.env_overrides().is_empty());

        let alt = build_lookup(RoutingDaemon::Bird, "10.0.0.1", LookupType::Bgp, Some("/run/bird2.ctl"))
            .unwrap();
        assert_eq!(
            alt.env_overrides(),
            &[("BIRDC".to_string(), "birdc -s /run/bird2.ctl".to_string())]
        );
        assert_eq!(alt.argv(), plain.argv());
    }

    #[test]
    fn no_backend_is_reported_not_retried() {
        let err = build_lookup(RoutingDaemon::Unavailable, "10.0.0.1", LookupType::Route, None)
            .unwrap_err();
        assert_eq!(err, RelayError::BackendUnavailable("No routing software detected.".into()));
    }

    #[test]
    fn as_paths_are_deduplicated_in_first_seen_order() {
        let raw = "10.0.0.0/8 unicast [peer1 2024-01-01] * (100) [AS30i]\n\
                   \tBGP.as_path: 10 20 30\n\
                   \tBGP.next_hop: 172.20.0.1\n\
                   \tBGP.as_path: 10 20 30\n\
                   unicast [peer2 2024-01-01] (100) [AS50i]\n\
                   \tBGP.as_path: 40 50\n";
        assert_eq!(extract_as_paths(raw), "10 20 30\n40 50");
    }

    #[test]
    fn as_path_extraction_falls_back_to_raw_output() {
        let raw = "Network not in table\n";
        assert_eq!(extract_as_paths(raw), raw);
    }

    #[test]
    fn as_path_values_are_trimmed() {
        let raw = "BGP.as_path:   4242420000 4242421080   \r\n";
        assert_eq!(extract_as_paths(raw), "4242420000 4242421080");
    }
}
