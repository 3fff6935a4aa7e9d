use crate::core::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How log lines are rendered on stderr
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogOutput {
    /// Human-readable lines with ANSI colours
    Console,
    Json,
}

impl LogOutput {
    pub fn from_config(config: &LoggingConfig) -> Self {
        if config.console || config.format == "console" {
            LogOutput::Console
        } else {
            LogOutput::Json
        }
    }
}

/// Filter directives: a non-blank `RUST_LOG` wins over the configured level
fn filter_directives(config: &LoggingConfig, rust_log: Option<String>) -> String {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => directives,
        _ => config.level.clone(),
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let directives = filter_directives(config, std::env::var("RUST_LOG").ok());
    let env_filter =
        EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(&config.level));

    // stdout belongs to the console client, logs go to stderr
    let installed = match LogOutput::from_config(config) {
        LogOutput::Console => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_ansi(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogOutput::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .try_init(),
    };

    installed.context("Failed to install tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;

    fn logging(extra: &str) -> LoggingConfig {
        let toml = format!("[gateway]\nendpoint = \"http://x\"\n[logging]\n{}", extra);
        Config::from_toml(&toml).unwrap().logging
    }

    #[test]
    fn test_output_follows_format_and_console_flag() {
        assert_eq!(LogOutput::from_config(&logging("")), LogOutput::Json);
        assert_eq!(LogOutput::from_config(&logging("format = \"console\"")), LogOutput::Console);
        assert_eq!(LogOutput::from_config(&logging("console = true")), LogOutput::Console);
    }

    #[test]
    fn test_rust_log_overrides_level() {
        let config = logging("level = \"warn\"");
        assert_eq!(filter_directives(&config, None), "warn");
        assert_eq!(filter_directives(&config, Some("  ".to_string())), "warn");
        assert_eq!(
            filter_directives(&config, Some("qr_attend=debug".to_string())),
            "qr_attend=debug"
        );
    }

    #[test]
    fn test_second_install_is_refused() {
        let config = logging("level = \"error\"");
        // Whichever call installs first, the next one must fail
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
