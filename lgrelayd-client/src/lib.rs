//! Dispatching side of the looking-glass relay.
//!
//! Loads the peer registry, decides whether a command runs on this node or
//! on a remote relay, signs envelopes for peers that share a secret and
//! renders results for operators.

pub mod dispatch;
pub mod registry;
pub mod render;
pub mod transport;

pub use dispatch::{Caller, Dispatcher};
pub use registry::{Peer, PeerPage, PeerRegistry, PAGE_SIZE};
pub use render::{render_error, render_output, PRESENTATION_LIMIT};
pub use transport::{HttpTransport, PeerReply, PeerTransport};

/// Environment variable naming the peer registry file.
pub const PEERS_ENV: &str = "LGRELAY_PEERS";
pub const DEFAULT_PEERS_FILE: &str = "peers.toml";
