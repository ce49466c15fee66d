//! Sub-configuration structs and their defaults.

use serde::{Deserialize, Serialize};

/// Payload conditioning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionerConfig {
    /// Largest request payload the providers accept, in bytes
    pub max_payload_bytes: u64,

    /// JPEG quality used for the first re-encode
    pub initial_quality: u8,

    /// Quality never drops below this
    pub min_quality: u8,

    /// Upper bound on downscale rounds
    pub max_rounds: u32,

    /// Start lowering quality once this many rounds have not been enough
    pub quality_drop_after: u32,

    /// Quality reduction applied per round once dropping starts
    pub quality_step: u8,

    /// Per-round dimension multiplier
    pub scale_factor: f64,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 20 * 1024 * 1024,
            initial_quality: 85,
            min_quality: 60,
            max_rounds: 5,
            quality_drop_after: 3,
            quality_step: 15,
            scale_factor: 0.8,
        }
    }
}

/// Provider chain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Providers in priority order
    pub order: Vec<String>,

    /// Per-provider timeout in milliseconds
    pub timeout_ms: u64,

    /// Run the pixel-statistics heuristic when every provider fails
    pub heuristic_fallback: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            order: vec![
                "gemini".to_string(),
                "openai".to_string(),
                "anthropic".to_string(),
            ],
            timeout_ms: 20_000,
            heuristic_fallback: true,
        }
    }
}

/// Idempotency cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Deduplicate requests by request id
    pub enabled: bool,

    /// How long a completed result is replayed, in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// LLM provider configurations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// Google Gemini configuration
    pub gemini: Option<ProviderConfig>,

    /// OpenAI configuration
    pub openai: Option<ProviderConfig>,

    /// Anthropic configuration
    pub anthropic: Option<ProviderConfig>,
}

impl LlmConfig {
    /// Resolved settings for a provider, falling back to its defaults.
    pub fn provider(&self, name: &str) -> Option<ProviderConfig> {
        match name {
            "gemini" => Some(self.gemini.clone().unwrap_or_else(ProviderConfig::gemini)),
            "openai" => Some(self.openai.clone().unwrap_or_else(ProviderConfig::openai)),
            "anthropic" => Some(
                self.anthropic
                    .clone()
                    .unwrap_or_else(ProviderConfig::anthropic),
            ),
            _ => None,
        }
    }
}

/// Connection settings for one vision provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// API base URL
    pub endpoint: String,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_sampling_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_sampling_temperature() -> f32 {
    0.4
}

impl ProviderConfig {
    pub fn gemini() -> Self {
        Self {
            api_key: "${GEMINI_API_KEY}".to_string(),
            model: "gemini-2.0-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1".to_string(),
            max_tokens: 2048,
            temperature: 0.4,
        }
    }

    pub fn openai() -> Self {
        Self {
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
            max_tokens: 1000,
            temperature: 0.4,
        }
    }

    pub fn anthropic() -> Self {
        Self {
            api_key: "${ANTHROPIC_API_KEY}".to_string(),
            model: "claude-3-opus-20240229".to_string(),
            endpoint: "https://api.anthropic.com/v1".to_string(),
            max_tokens: 1000,
            temperature: 0.4,
        }
    }
}
