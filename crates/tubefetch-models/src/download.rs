//! Download options and lifecycle status.
//!
//! The option catalog is fabricated: sizes are display labels only and no
//! option maps to a real stream.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output container of a download option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    Mp4,
    Mp3,
}

impl DownloadFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadFormat::Mp4 => "mp4",
            DownloadFormat::Mp3 => "mp3",
        }
    }
}

impl std::fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A selectable quality/format combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct DownloadOption {
    pub quality: &'static str,
    pub format: DownloadFormat,
    pub size: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<&'static str>,
}

impl DownloadOption {
    /// File label shown once the option is ready to download.
    pub fn file_label(&self) -> String {
        format!("video-{}", self.format)
    }
}

/// Static option catalog, best quality first.
pub static DOWNLOAD_OPTIONS: [DownloadOption; 4] = [
    DownloadOption {
        quality: "1080p Full HD",
        format: DownloadFormat::Mp4,
        size: "154.2 MB",
        badge: Some("Best"),
    },
    DownloadOption {
        quality: "720p HD",
        format: DownloadFormat::Mp4,
        size: "84.5 MB",
        badge: None,
    },
    DownloadOption {
        quality: "480p SD",
        format: DownloadFormat::Mp4,
        size: "42.1 MB",
        badge: None,
    },
    DownloadOption {
        quality: "320kbps Audio",
        format: DownloadFormat::Mp3,
        size: "8.4 MB",
        badge: None,
    },
];

/// Look up a catalog entry by index.
pub fn download_option(index: usize) -> Option<&'static DownloadOption> {
    DOWNLOAD_OPTIONS.get(index)
}

/// Simulated download lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Waiting for the user to start
    #[default]
    Idle,
    /// Pretending to connect
    Preparing,
    /// Progress ticking towards 100
    Downloading,
    /// Pretending to transcode
    Converting,
    /// File "ready"
    Completed,
    /// Reserved; no transition enters this state
    Error,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Idle => "idle",
            DownloadStatus::Preparing => "preparing",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Converting => "converting",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Error => "error",
        }
    }

    /// Progress-bar caption for in-flight states.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            DownloadStatus::Preparing => Some("Connecting..."),
            DownloadStatus::Downloading => Some("Downloading..."),
            DownloadStatus::Converting => Some("Processing..."),
            _ => None,
        }
    }

    /// Whether a simulated run is in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Preparing | DownloadStatus::Downloading | DownloadStatus::Converting
        )
    }

    /// Check if this is a terminal state (no more automatic updates).
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Error)
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time view of a download lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DownloadSnapshot {
    pub status: DownloadStatus,
    /// Progress in [0, 100]
    pub progress: f64,
    /// Attempt number; increments on every start
    pub attempt: u64,
    /// Index into [`DOWNLOAD_OPTIONS`]
    pub selected_option: usize,
}

impl DownloadSnapshot {
    /// Progress rounded for display.
    pub fn percent(&self) -> u8 {
        self.progress.round().clamp(0.0, 100.0) as u8
    }

    pub fn label(&self) -> Option<&'static str> {
        self.status.label()
    }
}
