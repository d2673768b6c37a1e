//! Events received from supervisord and their decoded form.

use crate::protocol::{parse_tokens, TokenError, EVENT_NAME_HEADER};
use std::collections::HashMap;
use thiserror::Error;

/// Event name prefix shared by all process state transitions.
pub const STATE_PREFIX: &str = "PROCESS_STATE_";

/// One event notification: the header line plus its payload.
///
/// Built fresh for every turn and dropped once the result is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Value of the `eventname` header (e.g. `PROCESS_STATE_EXITED`).
    pub event_name: String,
    pub headers: HashMap<String, String>,
    /// Exactly `len` bytes, as declared in the headers.
    pub payload: Vec<u8>,
}

impl Event {
    pub fn new(headers: HashMap<String, String>, payload: Vec<u8>) -> Option<Self> {
        let event_name = headers.get(EVENT_NAME_HEADER)?.clone();
        Some(Self {
            event_name,
            headers,
            payload,
        })
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Event serial assigned by supervisord, if present.
    pub fn serial(&self) -> Option<&str> {
        self.header("serial")
    }

    pub fn is_state_transition(&self) -> bool {
        self.event_name.starts_with(STATE_PREFIX)
    }
}

/// A process state change extracted from a `PROCESS_STATE_*` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransition {
    pub process_name: String,
    pub group_name: Option<String>,
    pub from_state: Option<String>,
    /// Event name with the prefix stripped, lowercased (`exited`, `running`).
    pub new_state: String,
    /// Absent for states without a live process (FATAL, BACKOFF).
    pub pid: Option<u32>,
}

/// Payload problems. These only affect the current event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] TokenError),

    #[error("payload has no processname")]
    MissingProcessName,
}

/// Decode a state transition out of an event.
///
/// Returns `Ok(None)` for any event that is not a `PROCESS_STATE_*` event.
/// Only the first payload line is parsed; state events carry a single line.
pub fn decode_transition(event: &Event) -> Result<Option<DecodedTransition>, DecodeError> {
    let Some(state) = event.event_name.strip_prefix(STATE_PREFIX) else {
        return Ok(None);
    };

    let payload = std::str::from_utf8(&event.payload).map_err(|_| DecodeError::InvalidUtf8)?;
    let first_line = payload.lines().next().unwrap_or("");
    let mut fields = parse_tokens(first_line)?;

    let process_name = fields
        .remove("processname")
        .ok_or(DecodeError::MissingProcessName)?;

    Ok(Some(DecodedTransition {
        process_name,
        group_name: fields.remove("groupname"),
        from_state: fields.remove("from_state"),
        new_state: state.to_lowercase(),
        pid: fields.get("pid").and_then(|pid| pid.parse().ok()),
    }))
}

// ============================================================================
// TESTS
// ============================================================================
