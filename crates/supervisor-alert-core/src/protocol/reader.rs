//! Event framing on the input stream.
//!
//! An event is one header line terminated by `\n`, followed by exactly `len`
//! payload bytes with no terminator of their own. The reader accumulates
//! bytes explicitly up to the newline and then up to the declared length, so
//! it never depends on how the underlying stream chunks its data.

use super::{parse_tokens, ProtocolError, EVENT_NAME_HEADER, LEN_HEADER};
use crate::event::Event;
use std::io::{BufRead, Read};

pub struct EventReader<R> {
    inner: R,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next header line, returning it without the newline.
    ///
    /// `Ok(None)` means the stream ended cleanly before any byte of a new
    /// header; an EOF in the middle of a line is a framing error.
    pub fn read_header_line(&mut self) -> Result<Option<String>, ProtocolError> {
        let mut buf = Vec::new();
        let n = self.inner.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        if buf.last() != Some(&b'\n') {
            return Err(ProtocolError::TruncatedHeader(n));
        }
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        String::from_utf8(buf)
            .map(Some)
            .map_err(|_| ProtocolError::InvalidUtf8)
    }

    /// Read exactly `len` payload bytes.
    pub fn read_payload(&mut self, len: usize) -> Result<Vec<u8>, ProtocolError> {
        let mut payload = Vec::new();
        let read = (&mut self.inner).take(len as u64).read_to_end(&mut payload)?;
        if read != len {
            return Err(ProtocolError::TruncatedPayload {
                expected: len,
                actual: read,
            });
        }
        Ok(payload)
    }

    /// Read one complete event.
    ///
    /// The header line is returned alongside the event for transcript logging.
    pub fn read_event(&mut self) -> Result<Option<(String, Event)>, ProtocolError> {
        let Some(line) = self.read_header_line()? else {
            return Ok(None);
        };
        let headers = parse_tokens(&line)?;

        let raw_len = headers
            .get(LEN_HEADER)
            .ok_or(ProtocolError::MissingHeader(LEN_HEADER))?;
        let len: usize = raw_len
            .parse()
            .map_err(|_| ProtocolError::InvalidLength(raw_len.clone()))?;

        let payload = self.read_payload(len)?;
        let event = Event::new(headers, payload)
            .ok_or(ProtocolError::MissingHeader(EVENT_NAME_HEADER))?;
        Ok(Some((line, event)))
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}
