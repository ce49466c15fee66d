//! Provider trait and request/response types.
//!
//! Defines the interface that all vision providers implement, plus the
//! factory that builds a provider from its config section.

use crate::config::LlmConfig;
use crate::error::{AnalysisError, AnalysisResult};
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

use super::prompt::{self, PromptContract};

/// Base64-encoded image ready to send to a provider API.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Create an `ImageInput` from raw bytes and format string.
    ///
    /// The format is the image format identifier (e.g., "jpeg", "png", "webp").
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        let media_type = match format {
            "jpeg" | "jpg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            other => {
                tracing::warn!("Unknown image format '{other}', defaulting to image/jpeg");
                "image/jpeg"
            }
        };

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// A request for a preset recommendation.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// The image to analyze
    pub image: ImageInput,
    /// Rendered prompt contract
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl AnalysisRequest {
    /// Build a request from an image and the provider's prompt contract.
    pub fn new(image: ImageInput, contract: &PromptContract) -> Self {
        Self {
            image,
            prompt: contract.render(),
            max_tokens: 2048,
            temperature: 0.4,
        }
    }

    pub fn with_limits(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

/// The raw response from a provider call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all vision providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the chain holds `Box<dyn AnalysisProvider>`).
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Provider name for logging and attempt records (e.g., "gemini").
    fn name(&self) -> &str;

    /// The prompt contract this provider is asked with.
    fn contract(&self) -> &'static PromptContract;

    /// Sampling limits for requests sent to this provider.
    fn limits(&self) -> (u32, f32) {
        (2048, 0.4)
    }

    /// Send one analysis request and return the raw text reply.
    async fn generate(&self, request: &AnalysisRequest) -> AnalysisResult<LlmResponse>;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates a provider from its name and the LLM config section.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider.
    ///
    /// A missing credential yields `ProviderUnavailable`, which the chain
    /// records as an advance without making any network call.
    pub fn create(
        provider: &str,
        config: &LlmConfig,
        timeout: Duration,
    ) -> AnalysisResult<Box<dyn AnalysisProvider>> {
        let cfg = config
            .provider(provider)
            .ok_or_else(|| AnalysisError::ProviderRequestFailed {
                provider: provider.to_string(),
                message: format!("Unknown provider: {provider}"),
                status_code: None,
            })?;
        let api_key =
            resolve_env_var(&cfg.api_key).ok_or_else(|| AnalysisError::ProviderUnavailable {
                provider: provider.to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::ProviderRequestFailed {
                provider: provider.to_string(),
                message: format!("Failed to build HTTP client: {e}"),
                status_code: None,
            })?;

        Ok(match provider {
            "gemini" => Box::new(super::gemini::GeminiProvider::new(
                client, timeout, &api_key, &cfg,
            )),
            "openai" => Box::new(super::openai::OpenAiProvider::new(
                client, timeout, &api_key, &cfg,
            )),
            _ => Box::new(super::anthropic::AnthropicProvider::new(
                client, timeout, &api_key, &cfg,
            )),
        })
    }
}

/// Placeholder for a provider whose construction failed.
///
/// Every call fails with the stored error so the chain records the attempt
/// at its rank and moves on.
pub(crate) struct UnavailableProvider {
    name: String,
    reason: String,
    missing_key: bool,
}

impl UnavailableProvider {
    pub(crate) fn new(name: &str, error: &AnalysisError) -> Self {
        Self {
            name: name.to_string(),
            reason: error.to_string(),
            missing_key: matches!(error, AnalysisError::ProviderUnavailable { .. }),
        }
    }
}

#[async_trait]
impl AnalysisProvider for UnavailableProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn contract(&self) -> &'static PromptContract {
        prompt::contract_for(&self.name)
    }

    async fn generate(&self, _request: &AnalysisRequest) -> AnalysisResult<LlmResponse> {
        if self.missing_key {
            Err(AnalysisError::ProviderUnavailable {
                provider: self.name.clone(),
            })
        } else {
            Err(AnalysisError::ProviderRequestFailed {
                provider: self.name.clone(),
                message: self.reason.clone(),
                status_code: None,
            })
        }
    }
}

/// Map a reqwest transport error onto the taxonomy.
pub(crate) fn transport_error(provider: &str, timeout: Duration, e: reqwest::Error) -> AnalysisError {
    if e.is_timeout() {
        AnalysisError::Timeout {
            provider: provider.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        AnalysisError::ProviderRequestFailed {
            provider: provider.to_string(),
            message: format!("request failed: {e}"),
            status_code: e.status().map(|s| s.as_u16()),
        }
    }
}

/// Turn a non-success HTTP response into `ProviderRequestFailed`.
pub(crate) async fn status_error(provider: &str, resp: reqwest::Response) -> AnalysisError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    AnalysisError::ProviderRequestFailed {
        provider: provider.to_string(),
        message: format!("HTTP {status}: {text}"),
        status_code: Some(status.as_u16()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;

    #[test]
    fn test_image_input_from_bytes_jpeg() {
        let input = ImageInput::from_bytes(&[0xFF, 0xD8, 0xFF], "jpeg");
        assert_eq!(input.media_type, "image/jpeg");
        assert_eq!(input.data, "/9j/");
    }

    #[test]
    fn test_image_input_from_bytes_webp() {
        let input = ImageInput::from_bytes(&[1, 2, 3], "webp");
        assert_eq!(input.media_type, "image/webp");
    }

    #[test]
    fn test_image_input_data_url() {
        let input = ImageInput::from_bytes(&[1, 2, 3], "png");
        assert_eq!(input.data_url(), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_request_carries_contract() {
        let image = ImageInput::from_bytes(&[1, 2, 3], "jpeg");
        let request = AnalysisRequest::new(image, &prompt::GEMINI).with_limits(1000, 0.2);
        assert!(request.prompt.contains("Basic Analysis"));
        assert_eq!(request.max_tokens, 1000);
        assert_eq!(request.temperature, 0.2);
    }

    #[test]
    fn test_resolve_env_var() {
        // Non-env-var strings pass through
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        // Empty returns None
        assert_eq!(resolve_env_var(""), None);
        // Unset env var returns None
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), None);
    }

    #[test]
    fn test_factory_missing_key_is_unavailable() {
        let mut config = LlmConfig::default();
        let mut gemini = ProviderConfig::gemini();
        gemini.api_key = "${TONECAST_TEST_UNSET_KEY_987}".to_string();
        config.gemini = Some(gemini);

        let result = ProviderFactory::create("gemini", &config, Duration::from_secs(1));
        assert!(matches!(
            result,
            Err(AnalysisError::ProviderUnavailable { ref provider }) if provider == "gemini"
        ));
    }

    #[test]
    fn test_factory_builds_configured_provider() {
        let mut config = LlmConfig::default();
        let mut openai = ProviderConfig::openai();
        openai.api_key = "sk-test".to_string();
        config.openai = Some(openai);

        let provider = ProviderFactory::create("openai", &config, Duration::from_secs(1)).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.limits(), (1000, 0.4));
    }

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let result = ProviderFactory::create("ollama", &LlmConfig::default(), Duration::from_secs(1));
        assert!(matches!(
            result,
            Err(AnalysisError::ProviderRequestFailed { .. })
        ));
    }
}
