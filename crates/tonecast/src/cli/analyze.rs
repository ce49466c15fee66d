//! The `tonecast analyze` command.

use clap::Args;
use std::path::PathBuf;
use tonecast_core::{AttemptOutcome, Config, Tonecast};

/// Arguments for the `analyze` command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Image file to analyze
    #[arg(required = true)]
    pub input: PathBuf,

    /// Write the preset sidecar here (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the analysis report as JSON instead of the sidecar
    #[arg(long)]
    pub json: bool,

    /// Idempotency key (defaults to the image content hash)
    ///
    /// Re-running the same image within the cache TTL replays the earlier
    /// result. Pass a fresh id to force a new analysis.
    #[arg(long, env = "TONECAST_REQUEST_ID")]
    pub request_id: Option<String>,

    /// Provider order override, comma separated (e.g. "openai,anthropic")
    #[arg(long, value_delimiter = ',')]
    pub providers: Vec<String>,

    /// Fail instead of falling back to the pixel heuristic
    #[arg(long)]
    pub no_heuristic: bool,
}

/// Apply command-line overrides on top of the loaded configuration.
pub(crate) fn apply_overrides(mut config: Config, args: &AnalyzeArgs) -> Config {
    if !args.providers.is_empty() {
        config.chain.order = args
            .providers
            .iter()
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
    }
    if args.no_heuristic {
        config.chain.heuristic_fallback = false;
    }
    config
}

/// Execute the analyze command.
pub async fn execute(args: AnalyzeArgs, config: Config) -> anyhow::Result<()> {
    let config = apply_overrides(config, &args);
    let tonecast = Tonecast::new(config)?;
    tracing::debug!(
        "Provider order: [{}], heuristic fallback {}",
        tonecast.config().chain.order.join(", "),
        tonecast.config().chain.heuristic_fallback
    );

    let bytes = tokio::fs::read(&args.input)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", args.input.display()))?;

    let export = tonecast.export(&bytes, args.request_id.as_deref()).await?;
    let report = &export.report;

    for attempt in &report.attempts {
        match &attempt.outcome {
            AttemptOutcome::Success => tracing::debug!(
                "#{} {} succeeded in {}ms",
                attempt.rank,
                attempt.provider,
                attempt.elapsed_ms
            ),
            AttemptOutcome::SoftFail(reason) | AttemptOutcome::HardFail(reason) => {
                tracing::debug!("#{} {} failed: {reason}", attempt.rank, attempt.provider)
            }
        }
    }
    if !report.conditioning.within_limit {
        tracing::warn!("Image could not be shrunk under the payload ceiling");
    }
    tracing::info!(
        "Adjustments from {}{}",
        report.provider,
        if report.from_cache { " (cached)" } else { "" }
    );

    if let Some(output_path) = &args.output {
        tokio::fs::write(output_path, &export.sidecar).await?;
        tracing::info!("Preset written to {}", output_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else if args.output.is_none() {
        print!("{}", export.sidecar);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(providers: &[&str]) -> AnalyzeArgs {
        AnalyzeArgs {
            input: PathBuf::from("photo.jpg"),
            output: None,
            json: false,
            request_id: None,
            providers: providers.iter().map(|p| p.to_string()).collect(),
            no_heuristic: false,
        }
    }

    #[test]
    fn no_overrides_keeps_config_order() {
        let config = apply_overrides(Config::default(), &args(&[]));
        assert_eq!(config.chain.order, vec!["gemini", "openai", "anthropic"]);
        assert!(config.chain.heuristic_fallback);
    }

    #[test]
    fn provider_override_is_normalized() {
        let config = apply_overrides(Config::default(), &args(&[" OpenAI", "", "anthropic "]));
        assert_eq!(config.chain.order, vec!["openai", "anthropic"]);
    }

    #[test]
    fn no_heuristic_disables_fallback() {
        let mut a = args(&["gemini"]);
        a.no_heuristic = true;
        let config = apply_overrides(Config::default(), &a);
        assert!(!config.chain.heuristic_fallback);
    }

    #[tokio::test]
    async fn unknown_provider_override_is_rejected() {
        let result = execute(args(&["ollama"]), Config::default()).await;
        let message = result.unwrap_err().to_string();
        assert!(message.contains("unknown provider 'ollama'"));
    }
}
