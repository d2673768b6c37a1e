//! The turn-taking state machine over the control streams.
//!
//! [`ControlChannel`] is the only thing that touches the listener's stdin and
//! stdout. Each method is legal in exactly one [`ListenerState`], which makes
//! a skipped or doubled result an `OutOfTurn` error instead of a silent
//! desync with supervisord.

use super::{EventReader, ListenerState, Outcome, ProtocolError, READY};
use crate::event::Event;
use crate::logging::{self, log_line, LogHandle};
use std::io::{BufRead, Write};

pub struct ControlChannel<R, W> {
    reader: EventReader<R>,
    writer: W,
    state: ListenerState,
    transcript: LogHandle,
}

impl<R: BufRead, W: Write> ControlChannel<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            reader: EventReader::new(input),
            writer: output,
            state: ListenerState::AwaitingReadyAck,
            transcript: logging::disabled(),
        }
    }

    /// Record every control line to the given transcript.
    pub fn with_transcript(mut self, transcript: LogHandle) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    fn expect_state(&self, expected: ListenerState) -> Result<(), ProtocolError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ProtocolError::OutOfTurn {
                expected,
                actual: self.state,
            })
        }
    }

    fn send(&mut self, data: &str) -> Result<(), ProtocolError> {
        self.writer.write_all(data.as_bytes())?;
        self.writer.flush()?;
        log_line(&self.transcript, "OUT", data.trim_end_matches('\n'));
        Ok(())
    }

    /// Tell supervisord we can take an event.
    pub fn ready(&mut self) -> Result<(), ProtocolError> {
        self.expect_state(ListenerState::AwaitingReadyAck)?;
        self.send(READY)?;
        self.state = ListenerState::WaitingForEvent;
        Ok(())
    }

    /// Block until the next event arrives.
    ///
    /// Returns `Ok(None)` when supervisord closed the stream between events.
    pub fn next_event(&mut self) -> Result<Option<Event>, ProtocolError> {
        self.expect_state(ListenerState::WaitingForEvent)?;
        let Some((line, event)) = self.reader.read_event()? else {
            return Ok(None);
        };
        log_line(&self.transcript, "IN", &line);
        self.state = ListenerState::Processing;
        Ok(Some(event))
    }

    /// `READY` followed by [`next_event`](Self::next_event).
    pub fn wait(&mut self) -> Result<Option<Event>, ProtocolError> {
        self.ready()?;
        self.next_event()
    }

    /// Write the single result owed for the current event.
    pub fn acknowledge(&mut self, outcome: Outcome) -> Result<(), ProtocolError> {
        self.expect_state(ListenerState::Processing)?;
        self.state = ListenerState::EmittingResult;
        self.send(&outcome.frame())?;
        self.state = ListenerState::AwaitingReadyAck;
        Ok(())
    }

    pub fn ok(&mut self) -> Result<(), ProtocolError> {
        self.acknowledge(Outcome::Ok)
    }

    pub fn fail(&mut self) -> Result<(), ProtocolError> {
        self.acknowledge(Outcome::Fail)
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader.into_inner(), self.writer)
    }
}

// ============================================================================
// TESTS
// ============================================================================
