//! Well-known filesystem locations.

use crate::host;
use std::env;
use std::path::PathBuf;

/// Relay binary name, looked up on PATH first.
pub const RELAY_PROGRAM: &str = "telegram-send";

/// Shared relay credentials file, readable by the listener account.
pub const RELAY_CONFIG: &str = "/etc/telegram-send.conf";

/// Where `--configure` installs the supervisord program section.
pub const SUPERVISOR_CONF: &str = "/etc/supervisor/conf.d/supervisor_alert.conf";

/// Return the user's home directory path.
pub fn get_home_dir() -> Result<String, String> {
    match env::var("HOME") {
        Ok(home) if !home.is_empty() => Ok(home),
        _ => Err("Home directory not set".to_string()),
    }
}

/// `~/.local/bin/telegram-send`, where `pip install --user` puts the relay.
///
/// Without `HOME` the passwd entry of the current uid supplies the home.
pub fn relay_fallback_path() -> Option<PathBuf> {
    get_home_dir()
        .ok()
        .or_else(host::current_user_home)
        .map(|home| PathBuf::from(home).join(".local/bin").join(RELAY_PROGRAM))
}
