//! AI insight models.
//!
//! Field names on the wire match the remote text-generation schema
//! (`suggestedFileName`), so the same type parses the model output and is
//! returned to clients.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Number of tags every insight payload carries.
pub const INSIGHT_TAG_COUNT: usize = 5;

/// Sentiment of a video as judged from its title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    /// All sentiment values, in schema order.
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured summary generated for a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AiInsights {
    /// Two-sentence summary
    pub summary: String,
    /// Exactly five SEO tags
    pub tags: Vec<String>,
    pub sentiment: Sentiment,
    /// Kebab-case, filesystem-safe name
    pub suggested_file_name: String,
}

/// Ways an insight payload can violate the schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaViolation {
    #[error("summary is empty")]
    EmptySummary,
    #[error("expected {expected} tags, got {actual}")]
    TagCount { expected: usize, actual: usize },
    #[error("tag {0} is blank")]
    BlankTag(usize),
    #[error("suggested file name is empty")]
    EmptyFileName,
}

impl AiInsights {
    /// Fixed payload used whenever live generation is unavailable.
    pub fn fallback() -> Self {
        Self {
            summary: "Could not generate AI insights at this time. Please try again later."
                .to_string(),
            tags: ["video", "youtube", "download", "media", "content"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            sentiment: Sentiment::Neutral,
            suggested_file_name: "video-download".to_string(),
        }
    }

    /// Check the payload against the generation schema.
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        if self.summary.trim().is_empty() {
            return Err(SchemaViolation::EmptySummary);
        }
        if self.tags.len() != INSIGHT_TAG_COUNT {
            return Err(SchemaViolation::TagCount {
                expected: INSIGHT_TAG_COUNT,
                actual: self.tags.len(),
            });
        }
        if let Some(idx) = self.tags.iter().position(|t| t.trim().is_empty()) {
            return Err(SchemaViolation::BlankTag(idx));
        }
        if self.suggested_file_name.trim().is_empty() {
            return Err(SchemaViolation::EmptyFileName);
        }
        Ok(())
    }

    /// Tags rendered as hashtags with all whitespace removed.
    pub fn display_tags(&self) -> Vec<String> {
        self.tags
            .iter()
            .map(|t| format!("#{}", t.split_whitespace().collect::<String>()))
            .collect()
    }

    /// Replace the suggested file name with its normalized form.
    pub fn normalize_file_name(mut self) -> Self {
        self.suggested_file_name = sanitize_file_name(&self.suggested_file_name);
        self
    }
}

/// Normalize a name to lowercase kebab-case ASCII.
///
/// Runs of anything other than `[a-z0-9]` collapse into a single `-`;
/// leading and trailing dashes are dropped.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_satisfies_schema() {
        let fallback = AiInsights::fallback();
        assert_eq!(fallback.validate(), Ok(()));
        assert_eq!(fallback.tags.len(), INSIGHT_TAG_COUNT);
        assert_eq!(fallback.sentiment, Sentiment::Neutral);
        assert_eq!(fallback.suggested_file_name, "video-download");
    }

    #[test]
    fn test_wire_format_matches_remote_schema() {
        let json = r#"{
            "summary": "A classic. It never gets old.",
            "tags": ["music", "80s", "pop", "rickroll", "classic"],
            "sentiment": "positive",
            "suggestedFileName": "never-gonna-give-you-up"
        }"#;
        let insights: AiInsights = serde_json::from_str(json).unwrap();
        assert_eq!(insights.sentiment, Sentiment::Positive);
        assert_eq!(insights.suggested_file_name, "never-gonna-give-you-up");
        assert_eq!(insights.validate(), Ok(()));

        let back = serde_json::to_value(&insights).unwrap();
        assert!(back.get("suggestedFileName").is_some());
    }

    #[test]
    fn test_json_schema_requires_all_fields() {
        let schema = serde_json::to_value(schemars::schema_for!(AiInsights)).unwrap();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        for field in ["summary", "tags", "sentiment", "suggestedFileName"] {
            assert!(required.contains(&field), "{} not required", field);
        }
    }

    #[test]
    fn test_unknown_sentiment_is_rejected() {
        let json = r#"{"summary":"s","tags":[],"sentiment":"ecstatic","suggestedFileName":"f"}"#;
        assert!(serde_json::from_str::<AiInsights>(json).is_err());
    }

    #[test]
    fn test_validate_reports_violations() {
        let mut insights = AiInsights::fallback();
        insights.tags.pop();
        assert_eq!(
            insights.validate(),
            Err(SchemaViolation::TagCount { expected: 5, actual: 4 })
        );

        let mut insights = AiInsights::fallback();
        insights.tags[2] = "  ".to_string();
        assert_eq!(insights.validate(), Err(SchemaViolation::BlankTag(2)));

        let mut insights = AiInsights::fallback();
        insights.summary = String::new();
        assert_eq!(insights.validate(), Err(SchemaViolation::EmptySummary));
    }

    #[test]
    fn test_display_tags_strip_whitespace() {
        let mut insights = AiInsights::fallback();
        insights.tags[0] = "music video".to_string();
        assert_eq!(insights.display_tags()[0], "#musicvideo");
        assert_eq!(insights.display_tags()[1], "#youtube");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Never Gonna Give You Up!"), "never-gonna-give-you-up");
        assert_eq!(sanitize_file_name("--already-kebab--"), "already-kebab");
        assert_eq!(sanitize_file_name("a/b\\c:d"), "a-b-c-d");
        assert_eq!(sanitize_file_name("???"), "");
    }
}
