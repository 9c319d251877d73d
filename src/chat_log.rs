//! Append-only chat log
//!
//! Every entry becomes one timestamped line appended to a text file and is
//! echoed through tracing. Failing to write the file is reported but never
//! interrupts the caller.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Timestamp layout: `DD/MM/YYYY hh:mm:ss`
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Prefix `text` with `[DD/MM/YYYY hh:mm:ss] ` and make sure it ends with
/// exactly one newline
pub fn timestamped_line(text: &str, at: DateTime<Local>) -> String {
    let text = text.strip_suffix('\n').unwrap_or(text);
    format!("[{}] {}\n", at.format(TIMESTAMP_FORMAT), text)
}

/// Handle to the chat log file
#[derive(Debug, Clone)]
pub struct ChatLog {
    path: PathBuf,
}

impl ChatLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry
    ///
    /// Each call opens the file in append mode and issues a single write,
    /// so concurrent entries never interleave within a line.
    pub async fn append(&self, text: &str) {
        let line = timestamped_line(text, Local::now());
        info!("{}", line.trim_end());

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await;

        let mut file = match file {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to open chat log {}: {}", self.path.display(), e);
                return;
            }
        };

        // tokio's File hands writes to a blocking task; flush waits for it
        let written = match file.write_all(line.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!("Failed to write chat log {}: {}", self.path.display(), e);
        }
    }
}
