//! Anthropic provider using the Messages API.
//!
//! Sends image + prompt via the Messages API with a base64 image content block.

use super::prompt::{self, PromptContract};
use super::provider::{status_error, transport_error, AnalysisProvider, AnalysisRequest, LlmResponse};
use crate::config::ProviderConfig;
use crate::error::{AnalysisError, AnalysisResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const API_VERSION: &str = "2023-06-01";

/// Anthropic provider using the Messages API.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
    client: reqwest::Client,
}

impl AnthropicProvider {
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
}

// --- Request types ---

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "image")]
    Image { source: ImageSource },
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseContent>,
    model: String,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ResponseContent {
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl AnalysisProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn contract(&self) -> &'static PromptContract {
        &prompt::ANTHROPIC
    }

    fn limits(&self) -> (u32, f32) {
        (self.max_tokens, self.temperature)
    }

    async fn generate(&self, request: &AnalysisRequest) -> AnalysisResult<LlmResponse> {
        let start = Instant::now();

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: Some(request.temperature),
            messages: vec![Message {
                role: "user".to_string(),
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64".to_string(),
                            media_type: request.image.media_type.clone(),
                            data: request.image.data.clone(),
                        },
                    },
                    ContentBlock::Text {
                        text: request.prompt.clone(),
                    },
                ],
            }],
        };

        let resp = self
            .client
            .post(format!("{}/messages", self.endpoint))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(self.name(), self.timeout, e))?;

        if !resp.status().is_success() {
            return Err(status_error(self.name(), resp).await);
        }

        let messages_resp: MessagesResponse =
            resp.json()
                .await
                .map_err(|e| AnalysisError::ResponseParseError {
                    provider: self.name().to_string(),
                    message: format!("unexpected response body: {e}"),
                })?;

        let text = messages_resp
            .content
            .into_iter()
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AnalysisError::ResponseParseError {
                provider: self.name().to_string(),
                message: "empty response, no text content generated".to_string(),
            });
        }

        Ok(LlmResponse {
            text,
            model: messages_resp.model,
            tokens_used: messages_resp
                .usage
                .map(|u| u.input_tokens + u.output_tokens),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
