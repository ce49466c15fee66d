//! Tonecast Core - photograph to editor preset pipeline.
//!
//! Tonecast takes a photograph, asks a chain of vision-capable language
//! models what edits would recreate its look, and serializes the answer as
//! a Camera Raw settings sidecar that photo editors can load as a preset.
//!
//! # Architecture
//!
//! ```text
//! Image → Condition payload → Provider chain (→ heuristic) → AdjustmentProfile → Sidecar
//!                 └──────────── idempotency cache ────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use tonecast_core::{Config, Tonecast};
//!
//! #[tokio::main]
//! async fn main() -> tonecast_core::Result<()> {
//!     let tonecast = Tonecast::new(Config::load()?)?;
//!     let bytes = std::fs::read("./photo.jpg")?;
//!
//!     let export = tonecast.export(&bytes, None).await?;
//!     println!("Answered by {}", export.report.provider);
//!     std::fs::write("./photo.xmp", export.sidecar)?;
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod cache;
pub mod config;
pub mod error;
pub mod heuristic;
pub mod llm;
pub mod payload;
pub mod profile;
pub mod sidecar;
pub mod temperature;

// Re-exports for convenient access
pub use cache::IdempotencyCache;
pub use config::Config;
pub use error::{AnalysisError, AnalysisResult, ConfigError, Result, SidecarError, TonecastError};
pub use llm::{AttemptOutcome, ProviderAttempt, ProviderChain};
pub use payload::{ConditionedImage, PayloadConditioner};
pub use profile::AdjustmentProfile;

use serde::Serialize;
use std::time::Duration;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What payload conditioning did to the upload.
#[derive(Debug, Clone, Serialize)]
pub struct ConditioningSummary {
    pub original_bytes: usize,
    pub sent_bytes: usize,
    pub rounds: u32,
    pub quality: Option<u8>,
    pub within_limit: bool,
}

/// Everything one analysis produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Client-supplied id, or the content hash when none was given
    pub request_id: String,
    pub profile: AdjustmentProfile,
    /// Provider whose answer was used
    pub provider: String,
    pub attempts: Vec<ProviderAttempt>,
    pub conditioning: ConditioningSummary,
    /// Replayed from the idempotency cache
    pub from_cache: bool,
}

/// An analysis plus its sidecar document.
#[derive(Debug, Clone)]
pub struct Export {
    pub report: AnalysisReport,
    pub sidecar: String,
}

/// Tonecast pipeline - the main entry point.
pub struct Tonecast {
    config: Config,
    conditioner: PayloadConditioner,
    chain: ProviderChain,
    cache: Option<IdempotencyCache<AnalysisReport>>,
}

impl Tonecast {
    /// Create a pipeline from configuration.
    ///
    /// Providers are built once here; API keys are resolved from the config
    /// (including `${ENV_VAR}` references) and never read again.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let chain = ProviderChain::from_config(&config.chain, &config.llm);
        Ok(Self::with_chain(config, chain))
    }

    /// Create a pipeline around an already-built provider chain.
    pub fn with_chain(config: Config, chain: ProviderChain) -> Self {
        tracing::debug!(
            "Initializing Tonecast v{} with providers [{}]",
            VERSION,
            chain.provider_names().join(", ")
        );
        let cache = config
            .cache
            .enabled
            .then(|| IdempotencyCache::new(Duration::from_secs(config.cache.ttl_secs)));
        Self {
            conditioner: PayloadConditioner::new(config.conditioner.clone()),
            chain,
            cache,
            config,
        }
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze an image.
    ///
    /// Provider failures never surface here. Only empty or undecodable
    /// input (and, with the heuristic disabled, an exhausted chain) does.
    pub async fn analyze(&self, bytes: &[u8], request_id: Option<&str>) -> Result<AnalysisReport> {
        if bytes.is_empty() {
            return Err(AnalysisError::EmptyInput.into());
        }
        let request_id = request_id
            .map(String::from)
            .unwrap_or_else(|| cache::content_request_id(bytes));

        let Some(cache) = &self.cache else {
            return self.run_pipeline(bytes, request_id).await;
        };
        let (mut report, hit) = cache
            .get_or_compute(&request_id, || self.run_pipeline(bytes, request_id.clone()))
            .await?;
        report.from_cache = hit;
        Ok(report)
    }

    /// Analyze an image and encode the result as a sidecar document.
    pub async fn export(&self, bytes: &[u8], request_id: Option<&str>) -> Result<Export> {
        let report = self.analyze(bytes, request_id).await?;
        let sidecar = sidecar::encode(&report.profile);
        Ok(Export { report, sidecar })
    }

    async fn run_pipeline(&self, bytes: &[u8], request_id: String) -> Result<AnalysisReport> {
        tracing::info!("Analyzing {} bytes (request {request_id})", bytes.len());

        let conditioner = self.conditioner.clone();
        let owned = bytes.to_vec();
        let conditioned = tokio::task::spawn_blocking(move || conditioner.condition(&owned))
            .await
            .map_err(|e| AnalysisError::Encode(format!("Task join error: {e}")))??;

        let outcome = self.chain.run(&conditioned, bytes).await?;

        Ok(AnalysisReport {
            request_id,
            profile: outcome.profile,
            provider: outcome.provider,
            attempts: outcome.attempts,
            conditioning: ConditioningSummary {
                original_bytes: bytes.len(),
                sent_bytes: conditioned.bytes.len(),
                rounds: conditioned.rounds,
                quality: conditioned.quality,
                within_limit: conditioned.within_limit,
            },
            from_cache: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::prompt::{self, PromptContract};
    use crate::llm::{AnalysisProvider, AnalysisRequest, LlmResponse};
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct CountingProvider {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl AnalysisProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn contract(&self) -> &'static PromptContract {
            &prompt::OPENAI
        }

        async fn generate(&self, _request: &AnalysisRequest) -> AnalysisResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LlmResponse {
                text: r#"{"basic": {"exposure": 0.3}, "color": {"temperature": 14400}}"#
                    .to_string(),
                model: "mock-v1".to_string(),
                tokens_used: None,
                latency_ms: 1,
            })
        }
    }

    fn png(color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(24, 24, Rgb(color));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn counting_tonecast(config: Config) -> (Tonecast, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let provider = CountingProvider {
            calls: calls.clone(),
        };
        let chain = ProviderChain::new(vec![Box::new(provider)], Duration::from_secs(5), true);
        (Tonecast::with_chain(config, chain), calls)
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = Config::default();
        config.chain.order = vec!["nope".to_string()];
        assert!(matches!(
            Tonecast::new(config),
            Err(TonecastError::Config(ConfigError::ValidationError(_)))
        ));
    }

    #[tokio::test]
    async fn test_analyze_uses_provider_and_reports_conditioning() {
        let (tonecast, calls) = counting_tonecast(Config::default());
        let bytes = png([100, 120, 140]);

        let report = tonecast.analyze(&bytes, Some("req-1")).await.unwrap();
        assert_eq!(report.provider, "counting");
        assert_eq!(report.request_id, "req-1");
        assert_eq!(report.profile.color.temperature, Some(-20.0));
        assert_eq!(report.conditioning.rounds, 0);
        assert_eq!(report.conditioning.sent_bytes, bytes.len());
        assert!(!report.from_cache);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeated_request_id_is_served_from_cache() {
        let (tonecast, calls) = counting_tonecast(Config::default());
        let bytes = png([100, 120, 140]);

        let first = tonecast.analyze(&bytes, Some("same")).await.unwrap();
        let second = tonecast.analyze(&bytes, Some("same")).await.unwrap();
        let third = tonecast.analyze(&bytes, Some("different")).await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.profile, second.profile);
        assert!(!third.from_cache);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_request_id_uses_content_hash() {
        let (tonecast, calls) = counting_tonecast(Config::default());
        let bytes = png([5, 5, 5]);

        let first = tonecast.analyze(&bytes, None).await.unwrap();
        let second = tonecast.analyze(&bytes, None).await.unwrap();

        assert_eq!(first.request_id, cache::content_request_id(&bytes));
        assert!(second.from_cache);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_computes() {
        let mut config = Config::default();
        config.cache.enabled = false;
        let (tonecast, calls) = counting_tonecast(config);
        let bytes = png([5, 5, 5]);

        tonecast.analyze(&bytes, Some("id")).await.unwrap();
        tonecast.analyze(&bytes, Some("id")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let (tonecast, calls) = counting_tonecast(Config::default());
        let err = tonecast.analyze(&[], None).await.unwrap_err();
        assert!(matches!(err, TonecastError::Analysis(AnalysisError::EmptyInput)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_heuristic_only_pipeline() {
        let mut config = Config::default();
        config.chain.order.clear();
        let tonecast = Tonecast::new(config).unwrap();

        let report = tonecast.analyze(&png([30, 30, 30]), None).await.unwrap();
        assert_eq!(report.provider, llm::HEURISTIC);
        assert_eq!(report.profile.basic.shadows, Some(15.0));
    }

    #[tokio::test]
    async fn test_export_encodes_sidecar() {
        let (tonecast, _) = counting_tonecast(Config::default());
        let export = tonecast.export(&png([100, 120, 140]), None).await.unwrap();

        assert!(export.sidecar.contains("<crs:Temperature>14400</crs:Temperature>"));
        assert!(export.sidecar.contains("<crs:Exposure>0.3</crs:Exposure>"));
        assert_eq!(
            sidecar::decode(&export.sidecar).unwrap().color.temperature,
            export.report.profile.color.temperature
        );
    }
}
