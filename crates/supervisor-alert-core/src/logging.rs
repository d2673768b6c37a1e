//! Protocol transcript logging.
//!
//! stdout belongs to supervisord, so the control channel can't be traced by
//! printing. When a transcript directory is configured, every line that
//! crosses the channel is appended to `{dir}/listener.log` with a timestamp.

use chrono::{SecondsFormat, Utc};
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};

/// File name of the transcript inside the transcript directory.
pub const TRANSCRIPT_FILE: &str = "listener.log";

/// Shared handle to an append-only transcript file.
pub type LogHandle = Arc<Mutex<Option<File>>>;

/// Current UTC time as ISO 8601 with milliseconds (e.g. 2026-02-04T10:15:30.123Z).
fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Write a timestamped line to the transcript (if open).
///
/// Embedded newlines are escaped so each record stays on one line.
pub fn log_line(handle: &LogHandle, direction: &str, data: &str) {
    if let Ok(mut guard) = handle.lock() {
        if let Some(ref mut file) = *guard {
            let ts = utc_timestamp();
            let data = data.replace('\n', "\\n");
            let _ = writeln!(file, "[{}] {}: {}", ts, direction, data);
            let _ = file.flush();
        }
    }
}

/// Open (or create) the transcript in `log_dir` and return a shared handle.
///
/// A missing directory argument, or one that can't be created, yields a
/// handle that silently discards lines.
pub fn open_transcript(log_dir: Option<&str>) -> LogHandle {
    let file = log_dir.and_then(|dir| {
        std::fs::create_dir_all(dir)
            .map_err(|e| log::warn!("Cannot create transcript dir {}: {}", dir, e))
            .ok()?;
        let path = Path::new(dir).join(TRANSCRIPT_FILE);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| log::warn!("Cannot open transcript {}: {}", path.display(), e))
            .ok()
    });
    Arc::new(Mutex::new(file))
}

/// A handle that discards everything.
pub fn disabled() -> LogHandle {
    Arc::new(Mutex::new(None))
}
