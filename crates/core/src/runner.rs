//! The single place where the relay starts external processes.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use crate::command::Invocation;
use crate::error::{RelayError, RelayResult};

/// Per-stream capture ceiling for child output.
pub const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the invocation once and return its useful text.
    async fn run(&self, invocation: &Invocation) -> RelayResult<String>;
}

/// Launches programs directly with `tokio::process`, no shell involved.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    max_output_bytes: usize,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_limit(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> RelayResult<String> {
        let program = invocation.program();
        let mut command = TokioCommand::new(program);
        command
            .args(invocation.argv())
            .envs(
                invocation
                    .env_overrides()
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            )
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|err| {
            RelayError::process(format!("failed to launch {}: {}", program, err))
        })?;

        let limit = self.max_output_bytes;
        let (stdout, stderr) = tokio::join!(
            read_capped(child.stdout.take(), limit),
            read_capped(child.stderr.take(), limit)
        );
        let status = child.wait().await.map_err(|err| {
            RelayError::process(format!("failed to wait for {}: {}", program, err))
        })?;

        let stdout = stdout
            .map_err(|err| RelayError::process(format!("failed to read {} stdout: {}", program, err)))?;
        let stderr = stderr
            .map_err(|err| RelayError::process(format!("failed to read {} stderr: {}", program, err)))?;

        if stdout.truncated || stderr.truncated {
            warn!(
                program,
                limit,
                "child output exceeded capture limit and was truncated"
            );
        }
        debug!(
            program,
            status = %status,
            stdout_len = stdout.text.len(),
            stderr_len = stderr.text.len(),
            "child process finished"
        );

        settle(
            program,
            ProcessOutcome {
                success: status.success(),
                status: status.to_string(),
                stdout: stdout.text,
                stderr: stderr.text,
            },
        )
    }
}

#[derive(Debug, Default)]
struct Captured {
    text: String,
    truncated: bool,
}

async fn read_capped<R>(reader: Option<R>, limit: usize) -> std::io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(Captured::default());
    };

    let mut buf = Vec::new();
    let mut limited = reader.take(limit as u64);
    limited.read_to_end(&mut buf).await?;

    // Keep draining so the child never stalls on a full pipe.
    let mut rest = limited.into_inner();
    let dropped = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await?;

    Ok(Captured {
        text: String::from_utf8_lossy(&buf).into_owned(),
        truncated: dropped > 0,
    })
}

/// What a finished child left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

/// Decide between result text and failure.
///
/// Diagnostics tools often exit non-zero while still printing something
/// useful (an unreachable host for ping), so non-empty stdout always wins.
pub fn settle(program: &str, outcome: ProcessOutcome) -> RelayResult<String> {
    let ProcessOutcome {
        success,
        status,
        stdout,
        stderr,
    } = outcome;

    if !stdout.is_empty() {
        return Ok(stdout);
    }
    if success {
        return Ok(stderr);
    }
    if !stderr.is_empty() {
        return Err(RelayError::Process(stderr));
    }
    Err(RelayError::process(format!("{} exited with {}", program, status)))
}
