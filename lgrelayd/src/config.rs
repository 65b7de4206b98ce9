use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use lgrelay_core::RoutingDaemon;
use serde::Deserialize;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 65534;
pub const DEFAULT_RUN_PATH: &str = "/api/run";
pub const SECRET_ENV: &str = "LGRELAY_SECRET";
pub const CONFIG_ENV: &str = "LGRELAY_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "lgrelay.toml";

/// Effective receiver settings after CLI, environment and file are merged.
#[derive(Debug, Clone)]
pub struct RelaydConfig {
    pub host: String,
    pub port: u16,
    pub run_path: String,
    pub secret: Option<String>,
    pub replay_protection: bool,
    /// `None` means probe the host at startup.
    pub routing: Option<RoutingDaemon>,
}

impl RelaydConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Default, Clone)]
pub struct CliRelaydOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub run_path: Option<String>,
    pub secret: Option<String>,
    pub allow_replay: bool,
    pub routing: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct FileRelaydConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub run_path: Option<String>,
    pub secret: Option<String>,
    pub allow_replay: Option<bool>,
    pub routing: Option<String>,
}

#[derive(Deserialize)]
struct RootConfig {
    #[serde(default)]
    relayd: Option<RawFileRelaydConfig>,
}

#[derive(Deserialize, Default)]
struct RawFileRelaydConfig {
    host: Option<String>,
    port: Option<u16>,
    run_path: Option<String>,
    secret: Option<String>,
    secret_file: Option<String>,
    allow_replay: Option<bool>,
    routing: Option<String>,
}

/// Pick the config file: explicit path, then `$LGRELAY_CONFIG`, then
/// `./lgrelay.toml` when present.
pub fn config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    cli_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
        .or_else(|| {
            let candidate = std::env::current_dir().ok()?.join(DEFAULT_CONFIG_FILE);
            candidate.is_file().then_some(candidate)
        })
}

pub fn load_file_config(path: Option<&Path>) -> Result<Option<FileRelaydConfig>> {
    let Some(path) = path else {
        return Ok(None);
    };

    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read relay config from {}", path.display()))?;
    let parsed: RootConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse TOML config {}", path.display()))?;

    parsed
        .relayd
        .map(|raw| raw.into_runtime_config(path.parent().unwrap_or(Path::new("."))))
        .transpose()
}

/// Merge CLI flags, the secret from the environment and the file config.
pub fn resolve(
    cli: &CliRelaydOptions,
    env_secret: Option<String>,
    file_cfg: Option<&FileRelaydConfig>,
) -> Result<RelaydConfig> {
    let host = cli
        .host
        .clone()
        .or_else(|| file_cfg.and_then(|cfg| cfg.host.clone()))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = cli
        .port
        .or_else(|| file_cfg.and_then(|cfg| cfg.port))
        .unwrap_or(DEFAULT_PORT);

    let run_path = normalize_run_path(
        cli.run_path
            .as_deref()
            .or_else(|| file_cfg.and_then(|cfg| cfg.run_path.as_deref()))
            .unwrap_or(DEFAULT_RUN_PATH),
    )?;

    let secret = cli
        .secret
        .clone()
        .or(env_secret)
        .or_else(|| file_cfg.and_then(|cfg| cfg.secret.clone()))
        .filter(|value| !value.trim().is_empty());

    let allow_replay =
        cli.allow_replay || file_cfg.and_then(|cfg| cfg.allow_replay).unwrap_or(false);

    let routing = match cli
        .routing
        .as_deref()
        .or_else(|| file_cfg.and_then(|cfg| cfg.routing.as_deref()))
    {
        Some(choice) => parse_routing_choice(choice)?,
        None => None,
    };

    Ok(RelaydConfig {
        host,
        port,
        run_path,
        secret,
        replay_protection: !allow_replay,
        routing,
    })
}

pub fn parse_routing_choice(choice: &str) -> Result<Option<RoutingDaemon>> {
    match choice.trim().to_ascii_lowercase().as_str() {
        "auto" => Ok(None),
        "frr" => Ok(Some(RoutingDaemon::Frr)),
        "bird" => Ok(Some(RoutingDaemon::Bird)),
        "none" => Ok(Some(RoutingDaemon::Unavailable)),
        other => Err(anyhow!(
            "Unsupported routing choice '{}'. Use auto, frr, bird or none.",
            other
        )),
    }
}

fn normalize_run_path(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return Err(anyhow!("run path must name a route below '/'"));
    }
    if trimmed.starts_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("/{}", trimmed))
    }
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

impl RawFileRelaydConfig {
    fn into_runtime_config(self, base: &Path) -> Result<FileRelaydConfig> {
        let secret = match (self.secret, self.secret_file) {
            (Some(secret), _) => Some(secret),
            (None, Some(file)) => {
                let path = resolve_relative(base, Path::new(&file));
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read secret file {}", path.display()))?;
                Some(contents.trim().to_string())
            }
            (None, None) => None,
        };

        Ok(FileRelaydConfig {
            host: self.host,
            port: self.port,
            run_path: self.run_path,
            secret,
            allow_replay: self.allow_replay,
            routing: self.routing,
        })
    }
}
