//! Google Gemini provider using the `generateContent` API.
//!
//! The prompt and the image travel as two parts of a single content entry;
//! the image as `inline_data`.

use super::prompt::{self, PromptContract};
use super::provider::{status_error, transport_error, AnalysisProvider, AnalysisRequest, LlmResponse};
use crate::config::ProviderConfig;
use crate::error::{AnalysisError, AnalysisResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const TOP_P: f32 = 0.95;
const TOP_K: u32 = 40;

/// Gemini provider.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(
        client: reqwest::Client,
        timeout: Duration,
        api_key: &str,
        config: &ProviderConfig,
    ) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout,
            client,
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

// --- Request types ---

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

// --- Response types ---

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u32>,
}

/// Text of the first part of the first candidate.
fn candidate_text(resp: &GenerateResponse) -> Option<&str> {
    resp.candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .first()?
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl AnalysisProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn contract(&self) -> &'static PromptContract {
        &prompt::GEMINI
    }

    fn limits(&self) -> (u32, f32) {
        (self.max_tokens, self.temperature)
    }

    async fn generate(&self, request: &AnalysisRequest) -> AnalysisResult<LlmResponse> {
        let start = Instant::now();

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: request.prompt.clone(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: request.image.media_type.clone(),
                            data: request.image.data.clone(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_p: TOP_P,
                top_k: TOP_K,
                max_output_tokens: request.max_tokens,
            },
        };

        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(self.name(), self.timeout, e))?;

        if !resp.status().is_success() {
            return Err(status_error(self.name(), resp).await);
        }

        let generated: GenerateResponse =
            resp.json()
                .await
                .map_err(|e| AnalysisError::ResponseParseError {
                    provider: self.name().to_string(),
                    message: format!("unexpected response body: {e}"),
                })?;

        let text = candidate_text(&generated)
            .ok_or_else(|| AnalysisError::ResponseParseError {
                provider: self.name().to_string(),
                message: "no text content in candidates".to_string(),
            })?
            .to_string();

        Ok(LlmResponse {
            text,
            model: generated
                .model_version
                .clone()
                .unwrap_or_else(|| self.model.clone()),
            tokens_used: generated.usage_metadata.and_then(|u| u.total_token_count),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
