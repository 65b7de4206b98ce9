//! Recording runner for tests that must not spawn real processes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::command::Invocation;
use crate::error::{RelayError, RelayResult};
use crate::runner::CommandRunner;

/// Answers by program name and remembers every invocation it was handed.
pub struct ScriptedRunner {
    responses: HashMap<String, RelayResult<String>>,
    fallback: RelayResult<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Invocation>>,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            fallback: Err(RelayError::process("command not found")),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(mut self, program: &str, result: RelayResult<String>) -> Self {
        self.responses.insert(program.to_string(), result);
        self
    }

    pub fn fallback(mut self, result: RelayResult<String>) -> Self {
        self.fallback = result;
        self
    }

    /// Sleep before answering, to widen race windows in concurrency tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self, program: &str) -> usize {
        self.calls()
            .iter()
            .filter(|inv| inv.program() == program)
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> RelayResult<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(invocation.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .get(invocation.program())
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
