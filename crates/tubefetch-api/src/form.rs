//! Input form validation.
//!
//! Checks the pasted link before anything reaches the session, and cleans up
//! the title typed into the preview panel.

use thiserror::Error;
use tubefetch_models::validate_url;

/// Maximum URL length accepted by the form.
pub const MAX_URL_LENGTH: usize = 2048;

/// Maximum title length.
pub const MAX_TITLE_LENGTH: usize = 500;

/// User-facing form errors. The message is shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Please enter a YouTube URL")]
    Empty,

    #[error("Invalid YouTube URL format")]
    InvalidFormat,

    #[error("Please enter a video title")]
    EmptyTitle,

    #[error("Title must be at most 500 characters")]
    TitleTooLong,
}

/// Validate a submitted link.
///
/// Returns the link unchanged so it can be forwarded as entered.
pub fn validate_submission(input: &str) -> Result<String, FormError> {
    if input.trim().is_empty() {
        return Err(FormError::Empty);
    }
    if input.len() > MAX_URL_LENGTH || !validate_url(input) {
        return Err(FormError::InvalidFormat);
    }
    Ok(input.to_string())
}

/// Remove control characters and surrounding whitespace from a string.
pub fn sanitize_string(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Validate and clean a manually entered title.
pub fn validate_title(input: &str) -> Result<String, FormError> {
    let title = sanitize_string(input);
    if title.is_empty() {
        return Err(FormError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(FormError::TitleTooLong);
    }
    Ok(title)
}
