//! Arbitrary command backend.
//!
//! `-c "mail -s alert ops@example.com"` runs
//! `mail -s alert ops@example.com '<message>'` for every alert.

use super::{report, Dispatcher, Runner};
use crate::config::ConfigError;
use crate::shell::{quote_command, split_command_line};

pub struct CommandBackend<R> {
    runner: R,
    argv: Vec<String>,
}

impl<R: Runner> CommandBackend<R> {
    /// Split the command line once; it is reused for every alert.
    pub fn new(runner: R, command_line: &str) -> Result<Self, ConfigError> {
        let argv = split_command_line(command_line).map_err(ConfigError::InvalidCommand)?;
        Ok(Self { runner, argv })
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl<R: Runner> Dispatcher for CommandBackend<R> {
    fn dispatch(&self, message: &str) -> bool {
        let (program, rest) = match self.argv.split_first() {
            Some(split) => split,
            None => return false,
        };
        let mut args = rest.to_vec();
        args.push(message.to_string());

        match self.runner.run(program, &args) {
            Ok(output) => report(program, &args, &output),
            Err(e) => {
                log::warn!("Failed to run {}: {}", quote_command(program, &args), e);
                false
            }
        }
    }
}
