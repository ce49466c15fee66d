//! OpenAI provider using the Chat Completions API.
//!
//! Sends the image as a data URL in the user message content array.

use super::prompt::{self, PromptContract};
use super::provider::{status_error, transport_error, AnalysisProvider, AnalysisRequest, LlmResponse};
use crate::config::ProviderConfig;
use crate::error::{AnalysisError, AnalysisResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// OpenAI provider using Chat Completions API.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiProvider {
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
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ChatContent>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: String,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

fn first_choice_text(resp: &ChatResponse) -> Option<String> {
    resp.choices
        .first()
        .and_then(|c| c.message.content.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

#[async_trait]
impl AnalysisProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn contract(&self) -> &'static PromptContract {
        &prompt::OPENAI
    }

    fn limits(&self) -> (u32, f32) {
        (self.max_tokens, self.temperature)
    }

    async fn generate(&self, request: &AnalysisRequest) -> AnalysisResult<LlmResponse> {
        let start = Instant::now();

        let body = ChatRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ChatContent::Text {
                        text: request.prompt.clone(),
                    },
                    ChatContent::ImageUrl {
                        image_url: ImageUrl {
                            url: request.image.data_url(),
                        },
                    },
                ],
            }],
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(self.name(), self.timeout, e))?;

        if !resp.status().is_success() {
            return Err(status_error(self.name(), resp).await);
        }

        let chat_resp: ChatResponse =
            resp.json()
                .await
                .map_err(|e| AnalysisError::ResponseParseError {
                    provider: self.name().to_string(),
                    message: format!("unexpected response body: {e}"),
                })?;

        let text = first_choice_text(&chat_resp).ok_or_else(|| {
            AnalysisError::ResponseParseError {
                provider: self.name().to_string(),
                message: "empty choices array, no content generated".to_string(),
            }
        })?;

        Ok(LlmResponse {
            text,
            model: chat_resp.model,
            tokens_used: chat_resp.usage.map(|u| u.total_tokens),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
