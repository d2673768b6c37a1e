//! One-time interactive setup (`supervisor-alert --configure`).
//!
//! Installs a supervisord `[eventlistener]` section that runs this binary
//! with the telegram backend, creates the unprivileged account it runs as,
//! reloads supervisord and hands over to `telegram-send --configure`.

use crate::dispatch::{RunOutput, Runner};
use crate::paths::{RELAY_CONFIG, RELAY_PROGRAM, SUPERVISOR_CONF};
use crate::shell::quote_command;
use std::io::{self, BufRead, Write};
use std::process::Command;
use thiserror::Error;

/// Account the listener runs as.
pub const LISTENER_ACCOUNT: &str = "supervisor_alert";

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Failed to read answer: {0}")]
    Prompt(#[source] io::Error),

    #[error("Can't save config to {path}, please execute as root: sudo supervisor-alert --configure")]
    WriteConfig {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed. Please retry as root or configure manually: https://github.com/rahiel/supervisor-alert#manual-configuration")]
    Supervisor { command: String },

    #[error("telegram-send setup failed: `{0}`")]
    Relay(String),
}

/// Paths and names used by setup.
#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub conf_path: String,
    pub account: String,
    pub relay_config: String,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            conf_path: SUPERVISOR_CONF.to_string(),
            account: LISTENER_ACCOUNT.to_string(),
            relay_config: RELAY_CONFIG.to_string(),
        }
    }
}

/// Runs programs attached to the terminal, for the interactive steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalRunner;

impl Runner for TerminalRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<RunOutput> {
        let status = Command::new(program).args(args).status()?;
        Ok(RunOutput {
            success: status.success(),
            code: status.code(),
            ..Default::default()
        })
    }
}

/// The supervisord program section for the listener.
pub fn render_listener_conf(show_hostname: bool, account: &str) -> String {
    let flags = if show_hostname { " --show-hostname" } else { "" };
    format!(
        "[eventlistener:supervisor_alert]
command=supervisor-alert --telegram{flags}
events=PROCESS_STATE_RUNNING,PROCESS_STATE_EXITED,PROCESS_STATE_FATAL
autostart=true
autorestart=true
stdout_logfile=NONE
user={account}
"
    )
}

fn ask_yes_no<I: BufRead, O: Write>(
    input: &mut I,
    output: &mut O,
    question: &str,
) -> Result<bool, SetupError> {
    write!(output, "{} [y/n] ", question).map_err(SetupError::Prompt)?;
    output.flush().map_err(SetupError::Prompt)?;
    let mut answer = String::new();
    input.read_line(&mut answer).map_err(SetupError::Prompt)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn run_step<R: Runner>(runner: &R, program: &str, args: &[&str]) -> Result<(), String> {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    let command = quote_command(program, &args);
    log::debug!("Running {}", command);
    match runner.run(program, &args) {
        Ok(output) if output.success => Ok(()),
        Ok(output) => {
            log::warn!("{} exited with {:?}", command, output.code);
            Err(command)
        }
        Err(e) => {
            log::warn!("Failed to run {}: {}", command, e);
            Err(command)
        }
    }
}

/// Run the interactive setup.
///
/// `account_exists` decides whether the listener account must be created.
pub fn configure<I, O, R, F>(
    options: &SetupOptions,
    input: &mut I,
    output: &mut O,
    runner: &R,
    account_exists: F,
) -> Result<(), SetupError>
where
    I: BufRead,
    O: Write,
    R: Runner,
    F: Fn(&str) -> bool,
{
    let show_hostname = ask_yes_no(input, output, "Prepend messages with the hostname?")?;

    std::fs::write(
        &options.conf_path,
        render_listener_conf(show_hostname, &options.account),
    )
    .map_err(|source| SetupError::WriteConfig {
        path: options.conf_path.clone(),
        source,
    })?;
    log::info!("Wrote {}", options.conf_path);

    if !account_exists(&options.account) {
        run_step(
            runner,
            "adduser",
            &[options.account.as_str(), "--system", "--no-create-home"],
        )
        .map_err(|command| SetupError::Supervisor { command })?;
    }

    for step in ["reread", "update"] {
        run_step(runner, "supervisorctl", &[step])
            .map_err(|command| SetupError::Supervisor { command })?;
    }

    writeln!(output, "Setting up telegram-send...").map_err(SetupError::Prompt)?;
    run_step(
        runner,
        RELAY_PROGRAM,
        &["--configure", "--config", options.relay_config.as_str()],
    )
    .map_err(SetupError::Relay)?;

    writeln!(output, "Supervisor-alert has been set up successfully!").map_err(SetupError::Prompt)?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
