//! Core of the looking-glass relay: the closed command set, argument
//! sanitizing, process execution, routing-daemon adaptation and the HMAC
//! envelope protocol spoken between relay nodes.

pub mod command;
pub mod engine;
pub mod error;
pub mod replay;
pub mod routing;
pub mod runner;
pub mod sanitize;
pub mod signature;

pub use command::{CommandArgs, CommandKind, Invocation};
pub use engine::LocalEngine;
pub use error::{RelayError, RelayResult};
pub use replay::ReplayGuard;
pub use routing::{LookupType, RoutingAdapter, RoutingDaemon};
pub use runner::{CommandRunner, SystemRunner, MAX_OUTPUT_BYTES};
pub use signature::{Envelope, SIGNATURE_WINDOW_MS};

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
