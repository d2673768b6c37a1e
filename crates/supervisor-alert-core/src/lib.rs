//! # supervisor-alert-core
//!
//! Core logic for supervisor-alert, a Supervisor event listener that turns
//! process state changes into chat alerts or arbitrary command invocations.
//!
//! This crate is I/O-agnostic: the control streams are any `BufRead`/`Write`
//! pair and subprocesses go through the [`dispatch::Runner`] seam, so the
//! binary wires in stdin/stdout while tests use in-memory buffers.
//!
//! ## Key Concepts
//!
//! - **Control channel**: the READY / event / RESULT handshake with supervisord
//! - **Event**: one header line plus `len` bytes of payload
//! - **Transition**: a decoded `PROCESS_STATE_*` event
//! - **Backend**: where rendered alerts go (telegram-send or a user command)

pub mod config;
pub mod dispatch;
pub mod event;
pub mod format;
pub mod host;
pub mod listener;
pub mod logging;
pub mod paths;
pub mod protocol;
pub mod setup;
pub mod shell;

// Re-export commonly used types
pub use config::{BackendSpec, ConfigError, ListenerConfig};
pub use dispatch::{AlertBackend, Dispatcher};
pub use event::{DecodedTransition, Event};
pub use listener::AlertListener;
pub use protocol::{ControlChannel, ListenerState, Outcome, ProtocolError};
