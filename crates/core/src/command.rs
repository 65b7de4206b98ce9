//! Closed set of diagnostic commands and the argv form they are launched in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::sanitize::sanitize;

/// Every command the relay will ever execute. Adding a variant is the only
/// way to widen what a peer can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Ping,
    Tcping,
    Trace,
    Route,
    Path,
    Whois,
    PubWhois,
    Dig,
    Nslookup,
}

impl CommandKind {
    pub const ALL: [CommandKind; 9] = [
        CommandKind::Ping,
        CommandKind::Tcping,
        CommandKind::Trace,
        CommandKind::Route,
        CommandKind::Path,
        CommandKind::Whois,
        CommandKind::PubWhois,
        CommandKind::Dig,
        CommandKind::Nslookup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Ping => "ping",
            CommandKind::Tcping => "tcping",
            CommandKind::Trace => "trace",
            CommandKind::Route => "route",
            CommandKind::Path => "path",
            CommandKind::Whois => "whois",
            CommandKind::PubWhois => "pub_whois",
            CommandKind::Dig => "dig",
            CommandKind::Nslookup => "nslookup",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CommandKind::Ping => "Ping IP/domain",
            CommandKind::Tcping => "TCP Ping",
            CommandKind::Trace => "Traceroute",
            CommandKind::Route => "Show route info",
            CommandKind::Path => "Show AS path",
            CommandKind::Whois => "Whois lookup",
            CommandKind::PubWhois => "ClearNet Whois lookup",
            CommandKind::Dig => "DNS query",
            CommandKind::Nslookup => "Nslookup DNS query",
        }
    }

    pub fn usage(&self) -> &'static str {
        match self {
            CommandKind::Ping => "ping <ip/domain>",
            CommandKind::Tcping => "tcping <host> <port>",
            CommandKind::Trace => "trace <ip/domain>",
            CommandKind::Route => "route <ip> [port]",
            CommandKind::Path => "path <ip> [port]",
            CommandKind::Whois => "whois <query>",
            CommandKind::PubWhois => "pub_whois <query>",
            CommandKind::Dig => "dig <domain> [type]",
            CommandKind::Nslookup => "nslookup <domain> [type]",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = RelayError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        CommandKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| RelayError::validation(format!("Invalid command: {}", name)))
    }
}

/// Caller-supplied arguments after sanitizing, one argv token each.
///
/// Values that would read as an option (`-x`) or split into several tokens
/// are refused outright; blank values count as missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArgs {
    kind: CommandKind,
    values: Vec<String>,
}

impl CommandArgs {
    pub fn parse(kind: CommandKind, raw: &[String]) -> Result<Self, RelayError> {
        let mut values = Vec::with_capacity(raw.len());
        for value in raw {
            let cleaned = sanitize(value).trim().to_string();
            if cleaned.starts_with('-') {
                return Err(RelayError::validation(format!(
                    "argument {:?} for {} must not start with '-'",
                    cleaned, kind
                )));
            }
            if cleaned.chars().any(char::is_whitespace) {
                return Err(RelayError::validation(format!(
                    "argument {:?} for {} must be a single token",
                    cleaned, kind
                )));
            }
            values.push(cleaned);
        }
        Ok(Self { kind, values })
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn optional(&self, index: usize) -> Option<&str> {
        self.values
            .get(index)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn required(&self, index: usize, name: &str) -> Result<&str, RelayError> {
        self.optional(index).ok_or_else(|| {
            RelayError::validation(format!(
                "missing argument {} for {} (usage: {})",
                name,
                self.kind,
                self.kind.usage()
            ))
        })
    }
}

/// A program plus argv, launched without any shell in between.
///
/// Arguments and environment values are sanitized on insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: &str) -> Self {
        Self {
            program: sanitize(program),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl AsRef<str>) -> Self {
        self.args.push(sanitize(value.as_ref()));
        self
    }

    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(values.into_iter().map(|value| sanitize(value.as_ref())));
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.env.push((sanitize(key), sanitize(value.as_ref())));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn argv(&self) -> &[String] {
        &self.args
    }

    pub fn env_overrides(&self) -> &[(String, String)] {
        &self.env
    }

    /// Human-readable rendering for logs. Never fed to a shell.
    pub fn command_line(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(key, value)| format!("{}={}", key, quote(value)))
            .collect();
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote(arg));
        }
        parts.push(sanitize(&line));
        parts.join(" ")
    }
}

fn quote(token: &str) -> String {
    if token.is_empty() || token.contains(' ') {
        format!("\"{}\"", token)
    } else {
        token.to_string()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for kind in CommandKind::ALL {
            assert_eq!(kind.as_str().parse::<CommandKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_names_are_validation_errors() {
        for name in ["checkpeers", "PING", "rm", "", "ping "] {
            let err = name.parse::<CommandKind>().unwrap_err();
            assert!(matches!(err, RelayError::Validation(_)), "{name}");
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&CommandKind::PubWhois).unwrap();
        assert_eq!(json, "\"pub_whois\"");
        let parsed: CommandKind = serde_json::from_str("\"nslookup\"").unwrap();
        assert_eq!(parsed, CommandKind::Nslookup);
    }

    #[test]
    fn required_rejects_missing_and_blank() {
        let raw = vec!["10.0.0.1".to_string(), "  ".to_string()];
        let args = CommandArgs::parse(CommandKind::Tcping, &raw).unwrap();
        assert_eq!(args.required(0, "host").unwrap(), "10.0.0.1");
        let err = args.required(1, "port").unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing argument port for tcping (usage: tcping <host> <port>)"
        );
        let empty = CommandArgs::parse(CommandKind::Ping, &[]).unwrap();
        assert!(empty.required(0, "target").is_err());
    }

    #[test]
    fn parse_sanitizes_values() {
        let raw = vec!["10.0.0.1;reboot".to_string(), "$(id)".to_string()];
        let args = CommandArgs::parse(CommandKind::Dig, &raw).unwrap();
        assert_eq!(args.optional(0), Some("10.0.0.1reboot"));
        assert_eq!(args.optional(1), Some("id"));
    }

    #[test]
    fn parse_refuses_option_like_values() {
        for bad in ["-f", "--help", ";-c100"] {
            let err = CommandArgs::parse(CommandKind::Ping, &[bad.to_string()]).unwrap_err();
            assert!(matches!(err, RelayError::Validation(_)), "{bad}");
        }
    }

    #[test]
    fn parse_refuses_multi_token_values() {
        let err =
            CommandArgs::parse(CommandKind::Route, &["10.0.0.1 neighbors".to_string()]).unwrap_err();
        assert!(err.to_string().contains("single token"));
    }

    #[test]
    fn invocation_sanitizes_each_token() {
        let inv = Invocation::new("ping").arg("-c").arg("4").arg("10.0.0.1;reboot");
        assert_eq!(inv.program(), "ping");
        assert_eq!(inv.argv(), &["-c", "4", "10.0.0.1reboot"]);
    }

    #[test]
    fn command_line_quotes_tokens_with_spaces() {
        let inv = Invocation::new("vtysh").arg("-c").arg("show ip route 10.0.0.0/8");
        assert_eq!(inv.command_line(), "vtysh -c \"show ip route 10.0.0.0/8\"");
    }

    #[test]
    fn command_line_renders_env_prefix() {
        let inv = Invocation::new("birdc")
            .env("BIRDC", "birdc -s 4000")
            .args(["show", "status"]);
        assert_eq!(inv.command_line(), "BIRDC=\"birdc -s 4000\" birdc show status");
    }
}
