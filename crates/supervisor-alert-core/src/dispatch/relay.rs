//! telegram-send backend.
//!
//! Invoked as `telegram-send <message> --config <path>`. When the binary is
//! not on PATH it is tried exactly once more at `~/.local/bin/telegram-send`.

use super::{report, Dispatcher, Runner};
use crate::paths::{relay_fallback_path, RELAY_PROGRAM};
use crate::shell::quote_command;
use std::io;

pub struct RelayBackend<R> {
    runner: R,
    program: String,
    fallback: Option<String>,
    config_path: String,
}

impl<R: Runner> RelayBackend<R> {
    pub fn new(runner: R, config_path: impl Into<String>) -> Self {
        Self {
            runner,
            program: RELAY_PROGRAM.to_string(),
            fallback: relay_fallback_path().map(|p| p.to_string_lossy().into_owned()),
            config_path: config_path.into(),
        }
    }

    /// Override the primary binary.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Override (or disable) the fallback binary.
    pub fn fallback(mut self, fallback: Option<String>) -> Self {
        self.fallback = fallback;
        self
    }

    fn args(&self, message: &str) -> Vec<String> {
        vec![
            message.to_string(),
            "--config".to_string(),
            self.config_path.clone(),
        ]
    }

    fn try_fallback(&self, args: &[String]) -> bool {
        let Some(fallback) = self.fallback.as_deref() else {
            log::warn!("{} not found and no fallback location is known", self.program);
            return false;
        };
        log::debug!("{} not found on PATH, trying {}", self.program, fallback);
        match self.runner.run(fallback, args) {
            Ok(output) => report(fallback, args, &output),
            Err(e) => {
                log::warn!("Failed to run {}: {}", quote_command(fallback, args), e);
                false
            }
        }
    }
}

impl<R: Runner> Dispatcher for RelayBackend<R> {
    fn dispatch(&self, message: &str) -> bool {
        let args = self.args(message);
        match self.runner.run(&self.program, &args) {
            Ok(output) => report(&self.program, &args, &output),
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.try_fallback(&args),
            Err(e) => {
                log::warn!("Failed to run {}: {}", quote_command(&self.program, &args), e);
                false
            }
        }
    }
}
