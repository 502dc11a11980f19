use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Download-specific events for the event system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    /// Download started; `total_size` comes from Content-Length when present
    Started {
        url: String,
        archive: String,
        total_size: Option<u64>,
    },

    /// Download completed successfully
    Completed {
        url: String,
        archive: String,
        final_size: u64,
        total_time: Duration,
    },
}
