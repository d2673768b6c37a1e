//! Alert delivery.
//!
//! # Overview
//!
//! A [`Dispatcher`] takes a rendered message and reports whether it was
//! delivered. Two backends exist, chosen once at startup:
//!
//! - [`relay`] - `telegram-send`, with a fallback to the per-user install
//! - [`command`] - an arbitrary user command, message appended last
//!
//! # Error Handling
//!
//! Nothing escapes [`Dispatcher::dispatch`] except a `bool`. Spawn failures
//! and non-zero exits are logged and turned into `false`, which the listener
//! reports to supervisord as `FAIL`.
//!
//! Subprocesses run through the [`Runner`] seam. [`SystemRunner`] gives the
//! child a null stdin and captures its output: stdout is the control channel
//! and a chatty backend must not write into it.

pub mod command;
pub mod relay;

use crate::config::{BackendSpec, ConfigError};
use crate::shell::quote_command;
use std::io;
use std::process::{Command, Stdio};

pub use command::CommandBackend;
pub use relay::RelayBackend;

/// Deliver one alert message.
pub trait Dispatcher {
    fn dispatch(&self, message: &str) -> bool;
}

impl<T: Dispatcher + ?Sized> Dispatcher for &T {
    fn dispatch(&self, message: &str) -> bool {
        (**self).dispatch(message)
    }
}

// ============================================================================
// RUNNER
// ============================================================================

/// Output of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    /// Whether the process exited with status 0
    pub success: bool,
    /// Exit code, `None` if killed by a signal
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl RunOutput {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim_end().to_string()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim_end().to_string()
    }
}

/// Runs a program to completion.
///
/// `Err` means the program could not be started at all; an
/// `io::ErrorKind::NotFound` error means the binary does not exist.
pub trait Runner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<RunOutput>;
}

impl<T: Runner + ?Sized> Runner for &T {
    fn run(&self, program: &str, args: &[String]) -> io::Result<RunOutput> {
        (**self).run(program, args)
    }
}

/// Runs programs as real child processes, blocking until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<RunOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        Ok(RunOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Log a finished delivery attempt and return whether it succeeded.
pub(crate) fn report(program: &str, args: &[String], output: &RunOutput) -> bool {
    let command = quote_command(program, args);
    if output.success {
        log::debug!("Alert delivered via {}", command);
        if !output.stdout.is_empty() {
            log::debug!("{} stdout: {}", program, output.stdout_str());
        }
    } else {
        match output.code {
            Some(code) => log::warn!("{} exited with status {}", command, code),
            None => log::warn!("{} was terminated by a signal", command),
        }
        if !output.stderr.is_empty() {
            log::warn!("{} stderr: {}", program, output.stderr_str());
        }
    }
    output.success
}

// ============================================================================
// BACKEND
// ============================================================================

/// The configured backend.
pub enum AlertBackend<R: Runner = SystemRunner> {
    Relay(RelayBackend<R>),
    Command(CommandBackend<R>),
}

impl AlertBackend<SystemRunner> {
    pub fn from_spec(spec: &BackendSpec) -> Result<Self, ConfigError> {
        Self::with_runner(spec, SystemRunner)
    }
}

impl<R: Runner> AlertBackend<R> {
    /// Build the backend, splitting a command line now rather than per alert.
    pub fn with_runner(spec: &BackendSpec, runner: R) -> Result<Self, ConfigError> {
        match spec {
            BackendSpec::Telegram { config_path } => {
                Ok(AlertBackend::Relay(RelayBackend::new(runner, config_path)))
            }
            BackendSpec::Command(line) => {
                Ok(AlertBackend::Command(CommandBackend::new(runner, line)?))
            }
        }
    }
}

impl<R: Runner> Dispatcher for AlertBackend<R> {
    fn dispatch(&self, message: &str) -> bool {
        match self {
            AlertBackend::Relay(relay) => relay.dispatch(message),
            AlertBackend::Command(command) => command.dispatch(message),
        }
    }
}

// ============================================================================
// TEST SUPPORT
// ============================================================================


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn telegram_spec_builds_relay() {
        let runner = ScriptedRunner::new(vec![exited(0)]);
        let backend = AlertBackend::with_runner(&BackendSpec::telegram(), &runner).unwrap();
        assert!(matches!(backend, AlertBackend::Relay(_)));
        assert!(backend.dispatch("hello"));
        assert_eq!(runner.calls()[0].0, "telegram-send");
    }

    #[test]
    fn command_spec_builds_command() {
        let runner = ScriptedRunner::new(vec![exited(1)]);
        let spec = BackendSpec::Command("notify --urgent".to_string());
        let backend = AlertBackend::with_runner(&spec, &runner).unwrap();
        assert!(matches!(backend, AlertBackend::Command(_)));
        assert!(!backend.dispatch("hello"));
        assert_eq!(
            runner.calls(),
            vec![(
                "notify".to_string(),
                vec!["--urgent".to_string(), "hello".to_string()]
            )]
        );
    }

    #[test]
    fn invalid_command_spec_is_config_error() {
        let spec = BackendSpec::Command("notify 'unclosed".to_string());
        assert!(matches!(
            AlertBackend::from_spec(&spec),
            Err(ConfigError::InvalidCommand(_))
        ));
    }

    #[test]
    fn report_reflects_success_flag() {
        let ok = RunOutput {
            success: true,
            code: Some(0),
            stdout: b"sent\n".to_vec(),
            stderr: Vec::new(),
        };
        assert!(report("telegram-send", &[], &ok));

        let failed = RunOutput {
            success: false,
            code: None,
            stdout: Vec::new(),
            stderr: b"boom".to_vec(),
        };
        assert!(!report("telegram-send", &[], &failed));
    }

    #[test]
    fn run_output_strings_are_trimmed() {
        let out = RunOutput {
            stdout: b"line\n".to_vec(),
            stderr: b"err\n\n".to_vec(),
            ..Default::default()
        };
        assert_eq!(out.stdout_str(), "line");
        assert_eq!(out.stderr_str(), "err");
    }

    #[test]
    #[cfg(unix)]
    fn system_runner_captures_output() {
        let out = SystemRunner
            .run("sh", &["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()])
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout_str(), "out");
        assert_eq!(out.stderr_str(), "err");
    }

    #[test]
    fn system_runner_reports_missing_binary() {
        let err = SystemRunner
            .run("/nonexistent/supervisor-alert-test-binary", &[])
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
