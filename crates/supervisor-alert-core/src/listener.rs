//! The listener main loop.
//!
//! One turn: `READY`, read an event, decode it, filter and render it, maybe
//! dispatch it, then write exactly one result. The result reflects alert
//! delivery only:
//!
//! | event                                   | dispatch | result |
//! |-----------------------------------------|----------|--------|
//! | not `PROCESS_STATE_*`                   | no       | OK     |
//! | state event with undecodable payload    | no       | OK     |
//! | excluded process                        | no       | OK     |
//! | delivered                               | yes      | OK     |
//! | delivery failed                         | yes      | FAIL   |
//!
//! Framing errors on the control streams end the loop; supervisord restarts
//! the listener according to its `autorestart` setting.

use crate::config::ListenerConfig;
use crate::dispatch::Dispatcher;
use crate::event::{decode_transition, Event};
use crate::format::render_message;
use crate::protocol::{ControlChannel, Outcome, ProtocolError};
use std::io::{BufRead, Write};

pub struct AlertListener<'a, R, W, D> {
    channel: ControlChannel<R, W>,
    config: &'a ListenerConfig,
    dispatcher: D,
}

impl<'a, R: BufRead, W: Write, D: Dispatcher> AlertListener<'a, R, W, D> {
    pub fn new(channel: ControlChannel<R, W>, config: &'a ListenerConfig, dispatcher: D) -> Self {
        Self {
            channel,
            config,
            dispatcher,
        }
    }

    /// Decide the result for one event, dispatching an alert if one is owed.
    pub fn handle(&self, event: &Event) -> Outcome {
        let serial = event.serial().unwrap_or("-");

        let transition = match decode_transition(event) {
            Ok(Some(transition)) => transition,
            Ok(None) => {
                log::debug!("Ignoring {} event (serial {})", event.event_name, serial);
                return Outcome::Ok;
            }
            Err(e) => {
                log::warn!(
                    "Cannot decode {} event (serial {}): {}",
                    event.event_name,
                    serial,
                    e
                );
                return Outcome::Ok;
            }
        };

        let Some(message) = render_message(&transition, self.config) else {
            log::info!(
                "{} is excluded, not alerting on {}",
                transition.process_name,
                transition.new_state
            );
            return Outcome::Ok;
        };

        log::info!("Alert: {}", message);
        let delivered = self.dispatcher.dispatch(&message);
        if !delivered {
            log::warn!("Alert delivery failed for serial {}", serial);
        }
        Outcome::from(delivered)
    }

    /// Run a single turn.
    ///
    /// Returns `Ok(None)` when supervisord closed the input stream.
    pub fn turn(&mut self) -> Result<Option<Outcome>, ProtocolError> {
        let Some(event) = self.channel.wait()? else {
            return Ok(None);
        };
        let outcome = self.handle(&event);
        self.channel.acknowledge(outcome)?;
        Ok(Some(outcome))
    }

    /// Run turns until the input stream closes.
    ///
    /// Returns the number of events processed.
    pub fn run(&mut self) -> Result<u64, ProtocolError> {
        let mut processed = 0;
        while self.turn()?.is_some() {
            processed += 1;
        }
        log::info!("Control channel closed after {} events", processed);
        Ok(processed)
    }

    pub fn channel(&self) -> &ControlChannel<R, W> {
        &self.channel
    }

    pub fn into_channel(self) -> ControlChannel<R, W> {
        self.channel
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendSpec;
    use crate::dispatch::testing::{exited, not_found, ScriptedRunner};
    use crate::dispatch::{AlertBackend, RelayBackend};
    use crate::protocol::ListenerState;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// Records messages and answers with scripted delivery results.
    #[derive(Default)]
    struct RecordingDispatcher {
        results: RefCell<VecDeque<bool>>,
        messages: RefCell<Vec<String>>,
    }

    impl RecordingDispatcher {
        fn answering(results: &[bool]) -> Self {
            Self {
                results: RefCell::new(results.iter().copied().collect()),
                messages: RefCell::new(Vec::new()),
            }
        }

        fn messages(&self) -> Vec<String> {
            self.messages.borrow().clone()
        }
    }

    impl Dispatcher for RecordingDispatcher {
        fn dispatch(&self, message: &str) -> bool {
            self.messages.borrow_mut().push(message.to_string());
            self.results.borrow_mut().pop_front().unwrap_or(true)
        }
    }

    fn frame(serial: u32, event_name: &str, payload: &str) -> String {
        format!(
            "ver:3.0 server:supervisor serial:{} pool:supervisor_alert poolserial:{} eventname:{} len:{}\n{}",
            serial,
            serial,
            event_name,
            payload.len(),
            payload
        )
    }

    fn config() -> ListenerConfig {
        ListenerConfig::new(BackendSpec::telegram())
    }

    type TestListener<'a, D> = AlertListener<'a, Cursor<Vec<u8>>, Vec<u8>, D>;

    fn listener<'a, D: Dispatcher>(
        input: &str,
        config: &'a ListenerConfig,
        dispatcher: D,
    ) -> TestListener<'a, D> {
        let channel = ControlChannel::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        AlertListener::new(channel, config, dispatcher)
    }

    fn written<D: Dispatcher>(listener: TestListener<'_, D>) -> String {
        String::from_utf8(listener.into_channel().into_parts().1).unwrap()
    }

    const EXITED: &str = "processname:webapp groupname:webapp from_state:RUNNING expected:0 pid:42";

    #[test]
    fn exited_event_is_dispatched_and_acknowledged_ok() {
        let config = config();
        let dispatcher = RecordingDispatcher::answering(&[true]);
        let mut l = listener(&frame(1, "PROCESS_STATE_EXITED", EXITED), &config, &dispatcher);

        assert_eq!(l.turn().unwrap(), Some(Outcome::Ok));
        assert_eq!(dispatcher.messages(), vec!["webapp has entered state exited"]);
        assert_eq!(written(l), "READY\nRESULT 2\nOK");
    }

    #[test]
    fn failed_delivery_is_acknowledged_fail() {
        let config = config();
        let dispatcher = RecordingDispatcher::answering(&[false]);
        let mut l = listener(&frame(1, "PROCESS_STATE_EXITED", EXITED), &config, &dispatcher);

        assert_eq!(l.turn().unwrap(), Some(Outcome::Fail));
        assert_eq!(dispatcher.messages().len(), 1);
        assert_eq!(written(l), "READY\nRESULT 4\nFAIL");
    }

    #[test]
    fn non_state_event_skips_dispatch() {
        let config = config();
        let dispatcher = RecordingDispatcher::default();
        let mut l = listener(&frame(1, "TICK_60", "when:1201063880"), &config, &dispatcher);

        assert_eq!(l.turn().unwrap(), Some(Outcome::Ok));
        assert!(dispatcher.messages().is_empty());
        assert_eq!(written(l), "READY\nRESULT 2\nOK");
    }

    #[test]
    fn excluded_process_skips_dispatch() {
        let config = config().exclude(["webapp"]);
        let dispatcher = RecordingDispatcher::answering(&[false]);
        let mut l = listener(&frame(1, "PROCESS_STATE_EXITED", EXITED), &config, &dispatcher);

        assert_eq!(l.turn().unwrap(), Some(Outcome::Ok));
        assert!(dispatcher.messages().is_empty());
    }

    #[test]
    fn undecodable_payload_is_acknowledged_ok() {
        let config = config();
        let dispatcher = RecordingDispatcher::answering(&[false]);
        let mut l = listener(
            &frame(1, "PROCESS_STATE_EXITED", "no colons here"),
            &config,
            &dispatcher,
        );

        assert_eq!(l.turn().unwrap(), Some(Outcome::Ok));
        assert!(dispatcher.messages().is_empty());
        assert_eq!(l.channel().state(), ListenerState::AwaitingReadyAck);
    }

    #[test]
    fn hostname_prefix_reaches_dispatcher() {
        let config = config().show_hostname("web-01");
        let dispatcher = RecordingDispatcher::default();
        let mut l = listener(
            &frame(1, "PROCESS_STATE_RUNNING", "processname:worker1 from_state:STARTING pid:7"),
            &config,
            &dispatcher,
        );

        l.turn().unwrap();
        assert_eq!(
            dispatcher.messages(),
            vec!["web-01: worker1 has entered state running"]
        );
    }

    #[test]
    fn ready_and_results_strictly_alternate() {
        let input: String = (1..=5)
            .map(|i| frame(i, "PROCESS_STATE_EXITED", EXITED))
            .collect();
        let config = config();
        let dispatcher = RecordingDispatcher::answering(&[true, false, true, true, false]);
        let mut l = listener(&input, &config, &dispatcher);

        for _ in 0..5 {
            assert!(l.turn().unwrap().is_some());
        }
        assert_eq!(
            written(l),
            "READY\nRESULT 2\nOK\
             READY\nRESULT 4\nFAIL\
             READY\nRESULT 2\nOK\
             READY\nRESULT 2\nOK\
             READY\nRESULT 4\nFAIL"
        );
    }

    #[test]
    fn run_processes_until_eof() {
        let input = [
            frame(1, "PROCESS_STATE_STARTING", "processname:cat from_state:STOPPED tries:0"),
            frame(2, "TICK_5", "when:5"),
            frame(3, "PROCESS_STATE_RUNNING", "processname:cat from_state:STARTING pid:9"),
        ]
        .concat();
        let config = config();
        let dispatcher = RecordingDispatcher::default();
        let mut l = listener(&input, &config, &dispatcher);

        assert_eq!(l.run().unwrap(), 3);
        assert_eq!(
            dispatcher.messages(),
            vec!["cat has entered state starting", "cat has entered state running"]
        );
        let out = written(l);
        assert_eq!(out.matches("READY\n").count(), 4);
        assert_eq!(out.matches("RESULT ").count(), 3);
        assert!(out.ends_with("OKREADY\n"));
    }

    #[test]
    fn framing_error_stops_after_last_complete_turn() {
        let input = format!(
            "{}eventname:PROCESS_STATE_EXITED len:500\nshort",
            frame(1, "PROCESS_STATE_EXITED", EXITED)
        );
        let config = config();
        let dispatcher = RecordingDispatcher::default();
        let mut l = listener(&input, &config, &dispatcher);

        assert!(matches!(
            l.run(),
            Err(ProtocolError::TruncatedPayload { expected: 500, .. })
        ));
        assert_eq!(dispatcher.messages().len(), 1);
        assert_eq!(written(l), "READY\nRESULT 2\nOKREADY\n");
    }

    #[test]
    fn relay_backend_end_to_end_with_fallback() {
        let config = config();
        let runner = ScriptedRunner::new(vec![not_found(), exited(0), exited(1)]);
        let backend = AlertBackend::Relay(
            RelayBackend::new(&runner, "/etc/telegram-send.conf")
                .fallback(Some("/opt/telegram-send".to_string())),
        );
        let input = [
            frame(1, "PROCESS_STATE_FATAL", "processname:db from_state:BACKOFF"),
            frame(2, "PROCESS_STATE_RUNNING", "processname:db from_state:STARTING pid:3"),
        ]
        .concat();
        let mut l = listener(&input, &config, backend);

        assert_eq!(l.turn().unwrap(), Some(Outcome::Ok));
        assert_eq!(l.turn().unwrap(), Some(Outcome::Fail));

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].1[0], "db has entered state fatal");
        assert_eq!(calls[1].0, "/opt/telegram-send");
        assert_eq!(calls[2].0, "telegram-send");
        assert_eq!(calls[2].1[0], "db has entered state running");
    }
}
