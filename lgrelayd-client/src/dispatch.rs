//! Routes a command to the local engine or to a remote relay.

use std::{fmt, sync::Arc};

use lgrelay_core::{CommandKind, Envelope, LocalEngine, RelayError, RelayResult};
use tracing::{info, warn};

use crate::{registry::PeerRegistry, transport::PeerTransport};

/// Who asked for a command; only used for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub name: String,
}

impl Caller {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id)
    }
}

pub struct Dispatcher {
    registry: Arc<PeerRegistry>,
    engine: Arc<LocalEngine>,
    transport: Arc<dyn PeerTransport>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<PeerRegistry>,
        engine: Arc<LocalEngine>,
        transport: Arc<dyn PeerTransport>,
    ) -> Self {
        Self {
            registry,
            engine,
            transport,
        }
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub async fn dispatch(
        &self,
        target: &str,
        command: &str,
        args: &[String],
        caller: Option<&Caller>,
    ) -> RelayResult<String> {
        let caller = caller.map_or_else(|| "Unknown User".to_string(), Caller::to_string);
        let kind: CommandKind = command.parse()?;

        if self.registry.is_local(target) {
            info!(
                caller = %caller,
                command = %kind,
                args = %args.join(" "),
                "LocalExec"
            );
            return self.engine.execute(kind, args).await;
        }

        let peer = self.registry.get(target).ok_or_else(|| {
            RelayError::validation(format!("Server with id \"{}\" not found", target))
        })?;
        let url = peer.url.as_deref().ok_or_else(|| {
            RelayError::validation(format!("Server url for \"{}\" not defined", target))
        })?;

        let envelope = match peer.secret() {
            Some(secret) => Envelope::signed(kind.as_str(), args, target, secret)?,
            None => Envelope::unsigned(kind.as_str(), args, target),
        };

        info!(
            caller = %caller,
            peer = target,
            command = %kind,
            args = %args.join(" "),
            signed = envelope.is_signed(),
            "RemoteExec"
        );

        let reply = self.transport.post(url, &envelope).await?;
        if reply.is_success() {
            Ok(reply.body)
        } else {
            warn!(peer = target, status = reply.status, "peer rejected request");
            Err(RelayError::Transport(reply.body))
        }
    }
}
