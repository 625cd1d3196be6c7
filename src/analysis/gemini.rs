//! # Gemini Analysis Client
//!
//! Calls the Generative Language API `generateContent` method with one inline
//! image part and the fixed food prompt, then hands the model's text to
//! [`food_parse::parse_food_records`].
//!
//! ```text
//! EncodedImage ──▶ GenerateContentRequest ──POST──▶ generateContent
//!                                                        │
//! AnalysisResult ◀── parse_food_records ◀── reply text ◀─┘
//! ```
//!
//! Failure mapping:
//!
//! | Condition | Error |
//! |-----------|-------|
//! | no API key | `Config` (raised before any request) |
//! | endpoint says the key is invalid | `Transport(InvalidCredential)` |
//! | network error, non-2xx, blocked prompt | `Transport(Request)` |
//! | 2xx with no usable reply | `Transport(Unknown)` |
//! | reply is not a valid food list | `Format` |

use async_trait::async_trait;
use food_parse::{AnalysisResult, parse_food_records};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::analysis::{Analyzer, FOOD_PROMPT};
use crate::config::AnalyzerConfig;
use crate::encoder::EncodedImage;
use crate::error::{CalorieError, CalorieResult, TransportErrorKind};

const API_KEY_HEADER: &str = "x-goog-api-key";
const INVALID_KEY_MARKER: &str = "API key not valid";
const INVALID_KEY_REASON: &str = "API_KEY_INVALID";

/// Request body of `models.generateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One part of a message: either text or inline binary data.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub response_mime_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    status: Option<String>,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

/// Builds the request body for one image.
pub fn build_request(image: &EncodedImage, config: &AnalyzerConfig) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: image.media_type.as_mime().to_string(),
                        data: image.data.clone(),
                    }),
                },
                Part {
                    text: Some(FOOD_PROMPT.to_string()),
                    inline_data: None,
                },
            ],
        }],
        generation_config: GenerationConfig {
            temperature: config.temperature,
            response_mime_type: "application/json".to_string(),
        },
    }
}

/// Extracts the model's reply text from a raw HTTP response.
///
/// # Errors
///
/// Transport errors for non-success statuses, blocked prompts and replies
/// without text. The returned text itself is not validated here.
pub fn interpret_response(status: StatusCode, body: &str) -> CalorieResult<String> {
    if !status.is_success() {
        return Err(classify_failure(status, body));
    }

    let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        error!(error = %e, "unreadable generateContent response");
        CalorieError::transport(
            TransportErrorKind::Unknown,
            "An unknown error occurred while analyzing the image.",
        )
    })?;

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return Err(CalorieError::transport(
            TransportErrorKind::Request,
            format!("the model declined to analyze the image (blocked: {})", reason),
        ));
    }

    let candidate = response.candidates.into_iter().next();
    let finish_reason = candidate
        .as_ref()
        .and_then(|c| c.finish_reason.clone())
        .unwrap_or_default();
    let text: String = candidate
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        warn!(finish_reason = %finish_reason, "model returned no text");
        return Err(CalorieError::transport(
            TransportErrorKind::Unknown,
            "An unknown error occurred while analyzing the image.",
        ));
    }

    debug!(finish_reason = %finish_reason, reply_len = text.len(), "model reply received");
    Ok(text)
}

fn classify_failure(status: StatusCode, body: &str) -> CalorieError {
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok();

    let invalid_key = parsed.as_ref().is_some_and(|envelope| {
        envelope
            .error
            .message
            .as_deref()
            .is_some_and(|m| m.contains(INVALID_KEY_MARKER))
            || envelope
                .error
                .details
                .iter()
                .any(|detail| detail.get("reason").and_then(|r| r.as_str()) == Some(INVALID_KEY_REASON))
    }) || body.contains(INVALID_KEY_MARKER);

    if invalid_key {
        warn!(status = %status, "endpoint rejected the API key");
        return CalorieError::invalid_credential();
    }

    let message = parsed
        .and_then(|envelope| {
            envelope.error.message.map(|message| match envelope.error.status {
                Some(code) => format!("{} ({})", message, code),
                None => message,
            })
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.to_string()
            } else {
                format!("{}: {}", status, trimmed)
            }
        });

    error!(status = %status, message = %message, "generateContent failed");
    CalorieError::transport(TransportErrorKind::Request, message)
}

/// [`Analyzer`] backed by the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: AnalyzerConfig,
}

impl GeminiClient {
    /// Creates a client. Succeeds without an API key; the missing key is
    /// reported by [`Analyzer::preflight`] and by every `analyze` call.
    ///
    /// # Errors
    ///
    /// [`CalorieError::Config`] when the settings are out of range or the HTTP
    /// client cannot be built.
    pub fn new(config: AnalyzerConfig) -> CalorieResult<Self> {
        config
            .validate()
            .map_err(|reason| CalorieError::config("analyzer", reason))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CalorieError::config("http_client", e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Full URL of the `generateContent` method for the configured model.
    pub fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl Analyzer for GeminiClient {
    fn preflight(&self) -> CalorieResult<()> {
        self.config.credential().map(|_| ())
    }

    async fn analyze(&self, image: &EncodedImage) -> CalorieResult<AnalysisResult> {
        let api_key = self.config.credential()?;
        let request = build_request(image, &self.config);

        info!(
            model = %self.config.model,
            media_type = %image.media_type,
            payload_len = image.payload_len(),
            "sending image for analysis"
        );

        let response = self
            .http
            .post(self.url())
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let reply = interpret_response(status, &body)?;

        let records = parse_food_records(&reply).map_err(|e| {
            error!(error = %e, reply = %reply, "model reply failed validation");
            CalorieError::format(e)
        })?;

        let result = AnalysisResult::from_records(records);
        info!(
            items = result.len(),
            total_calories = result.total_calories(),
            "analysis complete"
        );
        Ok(result)
    }
}
