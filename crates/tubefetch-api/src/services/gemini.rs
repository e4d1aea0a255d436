//! Gemini client for video insights.
//!
//! One `generateContent` call per request, with a JSON response schema. Any
//! failure is turned into the fixed fallback payload by [`InsightService`],
//! so callers always receive schema-valid insights.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};
use tubefetch_models::{AiInsights, SchemaViolation, Sentiment};

use crate::metrics;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key; `None` means every request falls back
    pub api_key: Option<String>,
    pub model: String,
    /// Scheme and host of the API, without a trailing slash
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url: std::env::var("GEMINI_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            timeout: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

/// Why a live insight request failed.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("API key missing")]
    MissingApiKey,

    #[error("Gemini API request failed: {0}")]
    Request(String),

    #[error("Gemini API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No response from AI")]
    EmptyResponse,

    #[error("Failed to parse insights JSON: {0}")]
    Parse(String),

    #[error("Insights violate schema: {0}")]
    Schema(#[from] SchemaViolation),
}

/// Result of an insight request.
#[derive(Debug, Clone, PartialEq)]
pub enum InsightOutcome {
    /// Payload produced by the model
    Live(AiInsights),
    /// Fixed fallback payload, with the reason the live call failed
    Fallback { insights: AiInsights, reason: String },
}

impl InsightOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, InsightOutcome::Fallback { .. })
    }

    /// Label reported to clients.
    pub fn source(&self) -> &'static str {
        match self {
            InsightOutcome::Live(_) => "live",
            InsightOutcome::Fallback { .. } => "fallback",
        }
    }

    pub fn into_insights(self) -> AiInsights {
        match self {
            InsightOutcome::Live(insights) | InsightOutcome::Fallback { insights, .. } => insights,
        }
    }
}

/// Produces insights for a video title. Never fails.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self, title: &str) -> InsightOutcome;

    /// Whether live generation is possible at all.
    fn is_live(&self) -> bool {
        true
    }
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini API client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Request insights for `title` with a single call.
    pub async fn try_generate(&self, title: &str) -> Result<AiInsights, InsightError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(InsightError::MissingApiKey)?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, api_key
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_insight_prompt(title),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: insight_response_schema(),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| InsightError::Request(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(InsightError::Status { status, body });
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| InsightError::Parse(e.without_url().to_string()))?;

        let text = gemini_response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(InsightError::EmptyResponse)?;

        parse_insights(&text)
    }
}

/// Parse and validate model output, tolerating a markdown code fence.
pub fn parse_insights(text: &str) -> Result<AiInsights, InsightError> {
    let text = strip_code_fence(text);
    let insights: AiInsights =
        serde_json::from_str(text).map_err(|e| InsightError::Parse(e.to_string()))?;
    insights.validate()?;

    let insights = insights.normalize_file_name();
    if insights.suggested_file_name.is_empty() {
        return Err(SchemaViolation::EmptyFileName.into());
    }
    Ok(insights)
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Build the prompt for a video title.
pub fn build_insight_prompt(title: &str) -> String {
    format!(
        r#"Analyze the following YouTube video title: "{}".
1. Write a short, engaging 2-sentence summary of what this video is likely about.
2. Generate 5 relevant SEO tags/hashtags.
3. Determine the likely sentiment (positive, neutral, negative).
4. Suggest a clean, SEO-friendly filename for downloading (kebab-case, no special chars)."#,
        title.replace('"', "'")
    )
}

fn insight_response_schema() -> serde_json::Value {
    let sentiments: Vec<&str> = Sentiment::ALL.iter().map(Sentiment::as_str).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "tags": { "type": "ARRAY", "items": { "type": "STRING" } },
            "sentiment": { "type": "STRING", "enum": sentiments },
            "suggestedFileName": { "type": "STRING" }
        },
        "required": ["summary", "tags", "sentiment", "suggestedFileName"]
    })
}

/// Insight generator backed by Gemini with a fixed fallback.
#[derive(Debug, Clone)]
pub struct InsightService {
    client: GeminiClient,
}

impl InsightService {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    pub fn from_env() -> Self {
        Self::new(GeminiClient::new(GeminiConfig::from_env()))
    }
}

#[async_trait]
impl InsightGenerator for InsightService {
    async fn generate(&self, title: &str) -> InsightOutcome {
        let outcome = match self.client.try_generate(title).await {
            Ok(insights) => {
                info!(file_name = %insights.suggested_file_name, "Generated AI insights");
                InsightOutcome::Live(insights)
            }
            Err(e) => {
                warn!("Gemini Error: {}", e);
                InsightOutcome::Fallback {
                    insights: AiInsights::fallback(),
                    reason: e.to_string(),
                }
            }
        };
        metrics::record_insight_outcome(outcome.source());
        outcome
    }

    fn is_live(&self) -> bool {
        self.client.has_api_key()
    }
}
