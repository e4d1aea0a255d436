//! Utility functions for video link parsing and validation.
//!
//! Links are untrusted input. Only YouTube hosts are accepted and the
//! extracted identifier is strictly validated (11 chars, alphanumeric + `-_`).

use thiserror::Error;
use url::Url;

/// Hosts that serve YouTube watch, embed and shorts pages.
const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

/// Host of the shortened link form.
const SHORT_HOST: &str = "youtu.be";

/// Length of a YouTube video identifier.
pub const YOUTUBE_ID_LEN: usize = 11;

/// Errors that can occur during YouTube ID extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum YoutubeIdError {
    /// Input was empty or whitespace
    #[error("URL is empty")]
    EmptyUrl,
    /// URL is not a valid YouTube URL
    #[error("URL is not a valid YouTube URL")]
    InvalidYoutubeUrl,
    /// Video ID has invalid format
    #[error("Video ID has invalid format")]
    InvalidVideoId,
    /// Video ID not found in URL
    #[error("Video ID not found in URL")]
    VideoIdNotFound,
}

/// Result type for YouTube ID extraction.
pub type YoutubeIdResult<T> = Result<T, YoutubeIdError>;

/// Extract the YouTube video ID from a pasted link.
///
/// Supports the standard, shortened and embed link shapes:
/// - https://youtube.com/watch?v=VIDEO_ID
/// - https://youtu.be/VIDEO_ID
/// - https://youtube.com/embed/VIDEO_ID
/// - https://youtube.com/v/VIDEO_ID
/// - https://youtube.com/shorts/VIDEO_ID
///
/// The scheme may be omitted. Query parameters and fragments are ignored.
pub fn extract_youtube_id(url: &str) -> YoutubeIdResult<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(YoutubeIdError::EmptyUrl);
    }

    let parsed = parse_lenient(url).ok_or(YoutubeIdError::InvalidYoutubeUrl)?;
    let host = parsed
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or(YoutubeIdError::InvalidYoutubeUrl)?;

    if host == SHORT_HOST {
        return first_segment(&parsed)
            .ok_or(YoutubeIdError::VideoIdNotFound)
            .and_then(validate_youtube_id);
    }

    if !is_youtube_host(&host) {
        return Err(YoutubeIdError::InvalidYoutubeUrl);
    }

    if let Some(id) = extract_from_watch_url(&parsed) {
        return validate_youtube_id(id);
    }

    for prefix in ["embed", "v", "shorts"] {
        if let Some(id) = extract_after_prefix(&parsed, prefix) {
            return validate_youtube_id(id);
        }
    }

    Err(YoutubeIdError::VideoIdNotFound)
}

/// Whether the input is a recognized video link.
pub fn validate_url(url: &str) -> bool {
    extract_youtube_id(url).is_ok()
}

/// Option-returning variant of [`extract_youtube_id`].
pub fn get_video_id(url: &str) -> Option<String> {
    extract_youtube_id(url).ok()
}

/// Parse a URL, assuming `https://` when no scheme is present.
fn parse_lenient(url: &str) -> Option<Url> {
    let parsed = if url.contains("://") {
        Url::parse(url).ok()?
    } else {
        Url::parse(&format!("https://{}", url)).ok()?
    };

    match parsed.scheme() {
        "http" | "https" => Some(parsed),
        _ => None,
    }
}

fn is_youtube_host(host: &str) -> bool {
    YOUTUBE_HOSTS.contains(&host)
}

/// Extract ID from youtube.com/watch?v=VIDEO_ID
fn extract_from_watch_url(url: &Url) -> Option<String> {
    if url.path().trim_end_matches('/') != "/watch" {
        return None;
    }
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.trim().to_string())
}

/// Extract ID from youtube.com/{prefix}/VIDEO_ID
fn extract_after_prefix(url: &Url, prefix: &str) -> Option<String> {
    let mut segments = url.path_segments()?;
    if segments.next()? != prefix {
        return None;
    }
    segments.next().map(|s| s.trim().to_string())
}

fn first_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .next()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Check if string contains only valid YouTube ID characters
fn is_valid_youtube_id_chars(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Validate YouTube video ID format and return it
fn validate_youtube_id(id: String) -> YoutubeIdResult<String> {
    if id.len() != YOUTUBE_ID_LEN || !is_valid_youtube_id_chars(&id) {
        return Err(YoutubeIdError::InvalidVideoId);
    }
    Ok(id)
}
