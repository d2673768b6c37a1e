//! Supervisor event listener protocol.
//!
//! # Overview
//!
//! supervisord talks to an event listener over the listener's stdin/stdout.
//! Every turn looks like this:
//!
//! ```text
//! listener -> supervisord   READY\n
//! supervisord -> listener   ver:3.0 server:supervisor serial:21 ... eventname:PROCESS_STATE_RUNNING len:54\n
//! supervisord -> listener   <54 bytes of payload>
//! listener -> supervisord   RESULT 2\nOK      (or RESULT 4\nFAIL)
//! ```
//!
//! supervisord will not send an event before it has seen `READY`, and will not
//! send the next one before it has seen a result. A listener that skips a
//! result, or writes two, is out of sync until it is restarted.
//!
//! # Modules
//!
//! - [`tokens`] - `key:value` token line parsing (shared with event payloads)
//! - [`reader`] - framing of header line plus `len` payload bytes
//! - [`channel`] - the turn-taking state machine over both streams

pub mod channel;
pub mod reader;
pub mod tokens;

use thiserror::Error;

pub use channel::ControlChannel;
pub use reader::EventReader;
pub use tokens::{parse_tokens, TokenError};

/// Token written when the listener can accept an event.
pub const READY: &str = "READY\n";

/// Header that carries the payload length.
pub const LEN_HEADER: &str = "len";

/// Header that carries the event type.
pub const EVENT_NAME_HEADER: &str = "eventname";

// ============================================================================
// ERROR TYPE
// ============================================================================

/// Fatal control channel errors.
///
/// Once one of these is returned the stream position is unknown, so the only
/// way out is to exit and let supervisord restart the listener.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Control channel I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Header line ended before newline ({0} bytes read)")]
    TruncatedHeader(usize),

    #[error("Header line is not valid UTF-8")]
    InvalidUtf8,

    #[error("Malformed header: {0}")]
    MalformedHeader(#[from] TokenError),

    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid payload length: {0:?}")]
    InvalidLength(String),

    #[error("Payload truncated: expected {expected} bytes, got {actual}")]
    TruncatedPayload { expected: usize, actual: usize },

    #[error("Out of turn: expected state {expected:?}, was {actual:?}")]
    OutOfTurn {
        expected: ListenerState,
        actual: ListenerState,
    },
}

// ============================================================================
// STATE
// ============================================================================

/// Where the listener is in the current turn.
///
/// The cycle is strictly
/// `AwaitingReadyAck -> WaitingForEvent -> Processing -> EmittingResult -> AwaitingReadyAck`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// A `READY` token is owed to supervisord.
    AwaitingReadyAck,
    /// `READY` was sent; blocked on the next header line.
    WaitingForEvent,
    /// An event was read; exactly one result is owed.
    Processing,
    /// The result is being written.
    EmittingResult,
}

/// Result of one turn, as reported to supervisord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Fail,
}

impl Outcome {
    /// Body of the result frame.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "OK",
            Outcome::Fail => "FAIL",
        }
    }

    /// Full result frame: `RESULT <len>\n<body>`.
    pub fn frame(&self) -> String {
        let body = self.as_str();
        format!("RESULT {}\n{}", body.len(), body)
    }
}

impl From<bool> for Outcome {
    fn from(success: bool) -> Self {
        if success {
            Outcome::Ok
        } else {
            Outcome::Fail
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
