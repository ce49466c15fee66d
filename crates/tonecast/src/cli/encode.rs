//! The `tonecast encode` command: profile JSON in, preset sidecar out.

use clap::Args;
use std::path::PathBuf;
use tonecast_core::{sidecar, AdjustmentProfile};

/// Arguments for the `encode` command.
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Adjustment profile as JSON (same shape `analyze --json` reports)
    #[arg(required = true)]
    pub profile: PathBuf,

    /// Write the sidecar here (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Parse a profile document and encode it, clamping out-of-range values.
pub(crate) fn encode_document(json: &str) -> anyhow::Result<String> {
    let mut profile: AdjustmentProfile = serde_json::from_str(json)?;
    profile.clamp_to_ranges();
    Ok(sidecar::encode(&profile))
}

/// Execute the encode command.
pub async fn execute(args: EncodeArgs) -> anyhow::Result<()> {
    let json = tokio::fs::read_to_string(&args.profile)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", args.profile.display()))?;
    let document = encode_document(&json)?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &document).await?;
            tracing::info!("Preset written to {}", path.display());
        }
        None => print!("{document}"),
    }
    Ok(())
}
