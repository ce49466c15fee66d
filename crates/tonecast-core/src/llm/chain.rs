//! Provider chain orchestrator.
//!
//! Providers are tried strictly one after another in priority order. Each
//! call is bounded by a timeout, and every failure (missing key, transport
//! error, timeout, unparseable or incomplete reply) is recorded and
//! advances the chain. The first success ends it. When every provider has
//! advanced, the pixel-statistics heuristic produces the profile; its
//! failure on an undecodable image is the only error a caller sees.

use serde::Serialize;
use std::time::{Duration, Instant};

use super::classify::{classify, FailureKind};
use super::parse::parse_profile;
use super::provider::{
    AnalysisProvider, AnalysisRequest, ImageInput, ProviderFactory, UnavailableProvider,
};
use crate::config::{ChainConfig, LlmConfig};
use crate::error::{AnalysisError, AnalysisResult};
use crate::heuristic;
use crate::payload::ConditionedImage;
use crate::profile::AdjustmentProfile;

/// Provider name recorded for the heuristic fallback.
pub const HEURISTIC: &str = "heuristic";

/// How one attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    SoftFail(String),
    HardFail(String),
}

impl AttemptOutcome {
    fn failure(error: &AnalysisError) -> Self {
        match classify(error) {
            FailureKind::Soft => Self::SoftFail(error.to_string()),
            FailureKind::Hard => Self::HardFail(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Record of one provider attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderAttempt {
    /// Provider name
    pub provider: String,
    /// Priority rank, starting at 1
    pub rank: usize,
    pub outcome: AttemptOutcome,
    /// Wall time spent on the attempt
    pub elapsed_ms: u64,
}

/// Result of running the chain.
#[derive(Debug, Clone, Serialize)]
pub struct ChainOutcome {
    pub profile: AdjustmentProfile,
    /// Name of the provider whose answer was used
    pub provider: String,
    pub attempts: Vec<ProviderAttempt>,
}

/// Ordered list of providers plus the terminal heuristic.
pub struct ProviderChain {
    providers: Vec<Box<dyn AnalysisProvider>>,
    timeout: Duration,
    heuristic_fallback: bool,
}

impl ProviderChain {
    pub fn new(
        providers: Vec<Box<dyn AnalysisProvider>>,
        timeout: Duration,
        heuristic_fallback: bool,
    ) -> Self {
        Self {
            providers,
            timeout,
            heuristic_fallback,
        }
    }

    /// Build the chain in `chain.order`.
    ///
    /// A provider that cannot be constructed (typically a missing API key)
    /// keeps its rank and fails immediately when tried.
    pub fn from_config(chain: &ChainConfig, llm: &LlmConfig) -> Self {
        let timeout = Duration::from_millis(chain.timeout_ms);
        let providers = chain
            .order
            .iter()
            .map(|name| match ProviderFactory::create(name, llm, timeout) {
                Ok(provider) => provider,
                Err(e) => {
                    tracing::debug!("Provider {name} unavailable: {e}");
                    Box::new(UnavailableProvider::new(name, &e)) as Box<dyn AnalysisProvider>
                }
            })
            .collect();
        Self::new(providers, timeout, chain.heuristic_fallback)
    }

    /// Provider names in priority order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Run the chain for a conditioned image.
    ///
    /// `original` is the unconditioned upload, used by the heuristic.
    pub async fn run(
        &self,
        image: &ConditionedImage,
        original: &[u8],
    ) -> AnalysisResult<ChainOutcome> {
        let input = ImageInput::from_bytes(&image.bytes, &image.format);
        let mut attempts = Vec::with_capacity(self.providers.len() + 1);

        for (index, provider) in self.providers.iter().enumerate() {
            let rank = index + 1;
            let name = provider.name().to_string();
            let started = Instant::now();

            match self.attempt(provider.as_ref(), &input).await {
                Ok(profile) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    tracing::info!("{name} (rank {rank}) produced a profile in {elapsed_ms}ms");
                    attempts.push(ProviderAttempt {
                        provider: name.clone(),
                        rank,
                        outcome: AttemptOutcome::Success,
                        elapsed_ms,
                    });
                    return Ok(ChainOutcome {
                        profile,
                        provider: name,
                        attempts,
                    });
                }
                Err(e) => {
                    if matches!(e, AnalysisError::ProviderUnavailable { .. }) {
                        tracing::debug!("Skipping {name}: {e}");
                    } else {
                        tracing::warn!("{name} (rank {rank}) failed, advancing: {e}");
                    }
                    attempts.push(ProviderAttempt {
                        provider: name,
                        rank,
                        outcome: AttemptOutcome::failure(&e),
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    });
                }
            }
        }

        let exhausted = AnalysisError::AllProvidersExhausted {
            attempted: attempts.len(),
        };
        if !self.heuristic_fallback {
            return Err(exhausted);
        }
        if !attempts.is_empty() {
            tracing::info!("{exhausted}, falling back to pixel heuristic");
        }

        let started = Instant::now();
        let bytes = original.to_vec();
        let profile = tokio::task::spawn_blocking(move || heuristic::analyze_bytes(&bytes))
            .await
            .map_err(|e| AnalysisError::ImageUndecodable(format!("Task join error: {e}")))??;

        attempts.push(ProviderAttempt {
            provider: HEURISTIC.to_string(),
            rank: attempts.len() + 1,
            outcome: AttemptOutcome::Success,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
        Ok(ChainOutcome {
            profile,
            provider: HEURISTIC.to_string(),
            attempts,
        })
    }

    /// One bounded provider call followed by parsing.
    async fn attempt(
        &self,
        provider: &dyn AnalysisProvider,
        input: &ImageInput,
    ) -> AnalysisResult<AdjustmentProfile> {
        let (max_tokens, temperature) = provider.limits();
        let request = AnalysisRequest::new(input.clone(), provider.contract())
            .with_limits(max_tokens, temperature);

        let response = tokio::time::timeout(self.timeout, provider.generate(&request))
            .await
            .map_err(|_| AnalysisError::Timeout {
                provider: provider.name().to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            })??;

        tracing::debug!(
            "{} replied with {} chars from {} in {}ms",
            provider.name(),
            response.text.len(),
            response.model,
            response.latency_ms
        );
        parse_profile(provider.name(), &response.text)
    }
}
