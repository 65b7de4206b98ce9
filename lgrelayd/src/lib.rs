//! Receiving side of the looking-glass relay.
//!
//! Accepts JSON envelopes over HTTP, authenticates them with the shared
//! secret and runs the requested diagnostic through the local engine.

pub mod config;
pub mod http_server;

pub use config::RelaydConfig;
pub use http_server::{router, run_http_server, RelayState};
