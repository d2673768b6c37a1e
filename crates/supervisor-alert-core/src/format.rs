//! Alert filtering and message text.

use crate::config::ListenerConfig;
use crate::event::DecodedTransition;

/// Render the alert for a transition, or `None` if the process is excluded.
///
/// `webapp has entered state exited`, or with the hostname flag
/// `web-01: webapp has entered state exited`.
pub fn render_message(transition: &DecodedTransition, config: &ListenerConfig) -> Option<String> {
    if config.is_excluded(&transition.process_name) {
        return None;
    }
    let message = format!(
        "{} has entered state {}",
        transition.process_name, transition.new_state
    );
    if config.show_hostname {
        Some(format!("{}: {}", config.hostname, message))
    } else {
        Some(message)
    }
}
