//! Logging initialization.
//!
//! Logs go to stderr; stdout carries the sidecar or report.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// RUST_LOG, when set, wins over `verbose`.
pub fn init(verbose: bool, json_format: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` section, with CLI overrides.
pub fn init_from_config(
    config: &tonecast_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let (verbose, json_format) = resolve(config, verbose_override, json_logs_override);
    init(verbose, json_format);
}

fn resolve(config: &tonecast_core::Config, verbose: bool, json_logs: bool) -> (bool, bool) {
    let verbose = verbose || matches!(config.logging.level.as_str(), "debug" | "trace");
    let json_format = json_logs || config.logging.format == "json";
    (verbose, json_format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonecast_core::Config;

    #[test]
    fn defaults_are_quiet_and_pretty() {
        assert_eq!(resolve(&Config::default(), false, false), (false, false));
    }

    #[test]
    fn config_level_and_format_apply() {
        let mut config = Config::default();
        config.logging.level = "trace".to_string();
        config.logging.format = "json".to_string();
        assert_eq!(resolve(&config, false, false), (true, true));
    }

    #[test]
    fn flags_override_config() {
        assert_eq!(resolve(&Config::default(), true, true), (true, true));
    }
}
