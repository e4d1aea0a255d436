//! Shared data models for the TubeFetch service.
//!
//! This crate provides Serde-serializable types for:
//! - Video link validation and ID extraction
//! - Located video details and thumbnails
//! - AI insight payloads and their fallback
//! - The download option catalog and lifecycle status
//! - WebSocket message schemas

pub mod download;
pub mod insights;
pub mod utils;
pub mod video;
pub mod ws;

// Re-export common types
pub use download::{
    download_option, DownloadFormat, DownloadOption, DownloadSnapshot, DownloadStatus,
    DOWNLOAD_OPTIONS,
};
pub use insights::{sanitize_file_name, AiInsights, SchemaViolation, Sentiment, INSIGHT_TAG_COUNT};
pub use utils::{extract_youtube_id, get_video_id, validate_url, YoutubeIdError, YoutubeIdResult};
pub use video::{thumbnail_url, VideoDetails};
pub use ws::WsMessage;
