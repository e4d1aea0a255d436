//! Video details models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::utils::{extract_youtube_id, YoutubeIdResult};

/// Base URL for YouTube thumbnail images.
const THUMBNAIL_BASE_URL: &str = "https://img.youtube.com/vi";

/// Derive the thumbnail URL for a video identifier.
///
/// `hqdefault` exists for every public video, unlike `maxresdefault`.
pub fn thumbnail_url(video_id: &str) -> String {
    format!("{}/{}/hqdefault.jpg", THUMBNAIL_BASE_URL, video_id)
}

/// A video located from a pasted link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VideoDetails {
    /// 11-character YouTube video ID (never empty)
    pub id: String,

    /// Link exactly as the user submitted it
    pub url: String,

    /// Thumbnail derived from the ID
    pub thumbnail_url: String,

    /// Title typed by the user when requesting insights
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl VideoDetails {
    /// Build video details from a raw link.
    pub fn from_url(url: impl Into<String>) -> YoutubeIdResult<Self> {
        let url = url.into();
        let id = extract_youtube_id(&url)?;
        Ok(Self {
            thumbnail_url: thumbnail_url(&id),
            id,
            url,
            title: None,
        })
    }

    /// Attach the manually entered title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
