//! Listener configuration.
//!
//! Built once at startup from the command line and then only ever borrowed.

use crate::host;
use crate::paths::RELAY_CONFIG;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No alert backend specified: use --telegram or --command")]
    NoBackend,

    #[error("Choose either --telegram or --command, not both")]
    ConflictingBackends,

    #[error("Invalid alert command: {0}")]
    InvalidCommand(String),

    #[error("Cannot determine hostname: {0}")]
    Hostname(#[source] std::io::Error),
}

/// Which backend delivers alerts. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSpec {
    /// `telegram-send <message> --config <config_path>`
    Telegram { config_path: String },
    /// A user command line; the message is appended as the last argument.
    Command(String),
}

impl BackendSpec {
    pub fn telegram() -> Self {
        BackendSpec::Telegram {
            config_path: RELAY_CONFIG.to_string(),
        }
    }

    /// Pick the backend from the CLI switches.
    pub fn select(
        telegram: bool,
        command: Option<&str>,
        relay_config: Option<&str>,
    ) -> Result<Self, ConfigError> {
        match (telegram, command) {
            (true, Some(_)) => Err(ConfigError::ConflictingBackends),
            (true, None) => Ok(BackendSpec::Telegram {
                config_path: relay_config.unwrap_or(RELAY_CONFIG).to_string(),
            }),
            (false, Some(cmd)) => Ok(BackendSpec::Command(cmd.to_string())),
            (false, None) => Err(ConfigError::NoBackend),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub backend: BackendSpec,
    /// Process names that never produce an alert.
    pub excluded: BTreeSet<String>,
    /// Prefix messages with `<hostname>: `.
    pub show_hostname: bool,
    pub hostname: String,
    /// Directory for the protocol transcript, if enabled.
    pub transcript_dir: Option<String>,
}

impl ListenerConfig {
    pub fn new(backend: BackendSpec) -> Self {
        Self {
            backend,
            excluded: BTreeSet::new(),
            show_hostname: false,
            hostname: String::new(),
            transcript_dir: None,
        }
    }

    /// Add process names to the exclusion set.
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(names.into_iter().map(Into::into));
        self
    }

    /// Prefix every message with the given hostname.
    pub fn show_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.show_hostname = true;
        self.hostname = hostname.into();
        self
    }

    /// Prefix every message with this machine's hostname.
    pub fn show_system_hostname(self) -> Result<Self, ConfigError> {
        let hostname = host::hostname().map_err(ConfigError::Hostname)?;
        Ok(self.show_hostname(hostname))
    }

    pub fn transcript_dir(mut self, dir: impl Into<String>) -> Self {
        self.transcript_dir = Some(dir.into());
        self
    }

    pub fn is_excluded(&self, process_name: &str) -> bool {
        self.excluded.contains(process_name)
    }
}

/// Parse a comma separated exclusion list (`"cron, backup"`).
///
/// Whitespace around names is trimmed and empty entries are ignored.
pub fn parse_exclusions(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
