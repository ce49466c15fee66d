//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::llm::KNOWN_PROVIDERS;

use super::Config;

/// Longest per-provider timeout accepted.
const MAX_TIMEOUT_MS: u64 = 120_000;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.conditioner;
        if c.max_payload_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "conditioner.max_payload_bytes must be > 0".into(),
            ));
        }
        if !(1..=100).contains(&c.initial_quality) {
            return Err(ConfigError::ValidationError(
                "conditioner.initial_quality must be between 1 and 100".into(),
            ));
        }
        if c.min_quality == 0 || c.min_quality > c.initial_quality {
            return Err(ConfigError::ValidationError(
                "conditioner.min_quality must be between 1 and initial_quality".into(),
            ));
        }
        if c.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "conditioner.max_rounds must be > 0".into(),
            ));
        }
        if !(c.scale_factor > 0.0 && c.scale_factor < 1.0) {
            return Err(ConfigError::ValidationError(
                "conditioner.scale_factor must be between 0.0 and 1.0 (exclusive)".into(),
            ));
        }
        if self.chain.timeout_ms == 0 || self.chain.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::ValidationError(format!(
                "chain.timeout_ms must be between 1 and {MAX_TIMEOUT_MS}"
            )));
        }
        if let Some(unknown) = self
            .chain
            .order
            .iter()
            .find(|name| !KNOWN_PROVIDERS.contains(&name.as_str()))
        {
            return Err(ConfigError::ValidationError(format!(
                "chain.order contains unknown provider '{unknown}' (expected one of {})",
                KNOWN_PROVIDERS.join(", ")
            )));
        }
        if self.chain.order.is_empty() && !self.chain.heuristic_fallback {
            return Err(ConfigError::ValidationError(
                "chain.order is empty and chain.heuristic_fallback is disabled".into(),
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}
