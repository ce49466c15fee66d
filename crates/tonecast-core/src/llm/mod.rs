//! Vision-provider integration and the provider chain.
//!
//! Provides a provider abstraction over the HTTP backends (Gemini, OpenAI,
//! Anthropic), their prompt contracts and response parsing, and the chain
//! that tries them in priority order before falling back to the pixel
//! heuristic.

pub(crate) mod anthropic;
pub(crate) mod chain;
pub(crate) mod classify;
pub(crate) mod gemini;
pub(crate) mod openai;
pub(crate) mod parse;
pub mod prompt;
pub(crate) mod provider;

/// Provider names accepted in `chain.order`.
pub const KNOWN_PROVIDERS: &[&str] = &["gemini", "openai", "anthropic"];

pub use chain::{AttemptOutcome, ChainOutcome, ProviderAttempt, ProviderChain, HEURISTIC};
pub use classify::{classify, FailureKind};
pub use parse::parse_profile;
pub use prompt::PromptContract;
pub use provider::{
    resolve_env_var, AnalysisProvider, AnalysisRequest, ImageInput, LlmResponse, ProviderFactory,
};
