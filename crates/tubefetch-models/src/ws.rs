//! WebSocket message types for the session event stream.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::download::DownloadStatus;
use crate::insights::AiInsights;
use crate::video::VideoDetails;

/// WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Log message with timestamp
    Log {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Download status changed
    Status {
        status: DownloadStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        attempt: u64,
    },

    /// Progress update (0-100)
    Progress { value: u8, attempt: u64 },

    /// Analysis finished and located a video
    VideoFound { video: VideoDetails },

    /// Analysis finished without a video
    VideoNotFound,

    /// Insights were generated (live or fallback)
    Insights {
        insights: AiInsights,
        fallback: bool,
    },

    /// Error message
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Simulated download finished
    Done {
        #[serde(rename = "fileLabel")]
        file_label: String,
        attempt: u64,
    },
}

impl WsMessage {
    /// Create a log message.
    pub fn log(message: impl Into<String>) -> Self {
        WsMessage::Log {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a status message.
    pub fn status(status: DownloadStatus, attempt: u64) -> Self {
        WsMessage::Status {
            status,
            label: status.label().map(str::to_string),
            attempt,
        }
    }

    /// Create a progress message.
    pub fn progress(value: u8, attempt: u64) -> Self {
        WsMessage::Progress {
            value: value.min(100),
            attempt,
        }
    }

    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        let now = Utc::now();
        let ts = now.format("%H:%M:%S").to_string();
        WsMessage::Error {
            message: format!("[{}] {}", ts, message.into()),
            timestamp: now,
        }
    }

    /// Short type tag, used for metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            WsMessage::Log { .. } => "log",
            WsMessage::Status { .. } => "status",
            WsMessage::Progress { .. } => "progress",
            WsMessage::VideoFound { .. } => "video_found",
            WsMessage::VideoNotFound => "video_not_found",
            WsMessage::Insights { .. } => "insights",
            WsMessage::Error { .. } => "error",
            WsMessage::Done { .. } => "done",
        }
    }
}
