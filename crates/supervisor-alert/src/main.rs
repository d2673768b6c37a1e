//! supervisor-alert binary.
//!
//! Runs as a supervisord event listener: stdin and stdout are the control
//! channel, so all logging goes to stderr (`RUST_LOG` overrides the default
//! `info` level).
//!
//! # Modes
//!
//! - `--telegram` / `--command CMD` - listen and alert until stdin closes
//! - `--configure` - interactive one-time setup, then exit

use std::io;
use std::process::ExitCode;

use clap::Parser;
use supervisor_alert_core::{
    config::parse_exclusions,
    host, logging,
    setup::{self, SetupOptions, TerminalRunner},
    AlertBackend, AlertListener, BackendSpec, ConfigError, ControlChannel, ListenerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "supervisor-alert")]
#[command(version)]
#[command(about = "Supervisor event listener to notify on process events.", long_about = None)]
#[command(after_help = "Homepage: https://github.com/rahiel/supervisor-alert")]
struct Cli {
    /// Command that receives each event message as its last argument
    #[arg(short, long, conflicts_with = "telegram")]
    command: Option<String>,

    /// Use telegram-send to send event messages
    #[arg(long)]
    telegram: bool,

    /// Configuration file passed to telegram-send
    #[arg(long, value_name = "PATH")]
    telegram_config: Option<String>,

    /// Configure supervisor-alert
    #[arg(long)]
    configure: bool,

    /// Show hostname in messages
    #[arg(long)]
    show_hostname: bool,

    /// Comma separated list of processes to exclude
    #[arg(long, value_name = "LIST")]
    exclude: Option<String>,

    /// Append a transcript of the control channel to DIR/listener.log
    #[arg(long, value_name = "DIR")]
    transcript_dir: Option<String>,
}

impl Cli {
    fn listener_config(&self) -> Result<ListenerConfig, ConfigError> {
        let backend = BackendSpec::select(
            self.telegram,
            self.command.as_deref(),
            self.telegram_config.as_deref(),
        )?;

        let mut config = ListenerConfig::new(backend);
        if let Some(list) = &self.exclude {
            config = config.exclude(parse_exclusions(list));
        }
        if self.show_hostname {
            config = config.show_system_hostname()?;
        }
        if let Some(dir) = &self.transcript_dir {
            config = config.transcript_dir(dir.as_str());
        }
        Ok(config)
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();
}

fn run_setup(cli: &Cli) -> ExitCode {
    let mut options = SetupOptions::default();
    if let Some(path) = &cli.telegram_config {
        options.relay_config = path.clone();
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    match setup::configure(
        &options,
        &mut stdin.lock(),
        &mut stdout.lock(),
        &TerminalRunner,
        host::account_exists,
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_listener(config: &ListenerConfig) -> ExitCode {
    let backend = match AlertBackend::from_spec(&config.backend) {
        Ok(backend) => backend,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::from(2);
        }
    };

    let transcript = logging::open_transcript(config.transcript_dir.as_deref());
    let channel = ControlChannel::new(io::stdin().lock(), io::stdout().lock())
        .with_transcript(transcript);
    let mut listener = AlertListener::new(channel, config, backend);

    log::info!(
        "Listening for process state events ({} excluded)",
        config.excluded.len()
    );
    match listener.run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Fatal protocol error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    if cli.configure {
        return run_setup(&cli);
    }

    match cli.listener_config() {
        Ok(config) => run_listener(&config),
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(2)
        }
    }
}
