use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::scanner::scan_loop::ScannerOptions;
use crate::scanner::FacingMode;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub qr_display: QrDisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub endpoint: String,
    /// Bearer token handed out by the identity provider; absent means signed out
    pub identity_token: Option<String>,
    /// Caller principal matching `identity_token`
    pub principal: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_facing_mode")]
    pub facing_mode: String,
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// How long `scan <image>` looks for a code before giving up
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "default_splash_duration_ms")]
    pub splash_duration_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QrDisplayConfig {
    #[serde(default = "default_image_service")]
    pub image_service: String,
    #[serde(default = "default_image_size")]
    pub image_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            facing_mode: default_facing_mode(),
            scan_interval_ms: default_scan_interval_ms(),
            max_results: default_max_results(),
            scan_timeout_ms: default_scan_timeout_ms(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            splash_duration_ms: default_splash_duration_ms(),
        }
    }
}

impl Default for QrDisplayConfig {
    fn default() -> Self {
        Self {
            image_service: default_image_service(),
            image_size: default_image_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

// Default value functions
fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_facing_mode() -> String {
    "environment".to_string()
}

fn default_scan_interval_ms() -> u64 {
    100
}

fn default_max_results() -> usize {
    1
}

fn default_scan_timeout_ms() -> u64 {
    5_000
}

fn default_splash_duration_ms() -> u64 {
    2_000
}

fn default_image_service() -> String {
    "https://api.qrserver.com/v1/create-qr-code/".to_string()
}

fn default_image_size() -> u32 {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl ScannerConfig {
    pub fn facing_mode(&self) -> FacingMode {
        FacingMode::parse(&self.facing_mode).unwrap_or(FacingMode::Environment)
    }

    pub fn options(&self) -> ScannerOptions {
        ScannerOptions {
            facing_mode: self.facing_mode(),
            scan_interval: Duration::from_millis(self.scan_interval_ms),
            max_results: self.max_results,
        }
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.gateway.endpoint.trim().is_empty() {
            bail!("gateway.endpoint must not be empty");
        }

        if self.gateway.request_timeout_ms == 0 {
            bail!("gateway.request_timeout_ms must be greater than 0");
        }

        if self.gateway.identity_token.is_some() && self.gateway.principal.is_none() {
            bail!("gateway.principal is required when identity_token is set");
        }

        if FacingMode::parse(&self.scanner.facing_mode).is_none() {
            bail!(
                "Invalid facing mode '{}'. Must be one of: environment, user",
                self.scanner.facing_mode
            );
        }

        if self.scanner.scan_interval_ms == 0 {
            bail!("scanner.scan_interval_ms must be greater than 0");
        }

        if self.scanner.max_results == 0 {
            bail!("scanner.max_results must be greater than 0");
        }

        if self.scanner.scan_timeout_ms == 0 {
            bail!("scanner.scan_timeout_ms must be greater than 0");
        }

        if self.qr_display.image_service.trim().is_empty() {
            bail!("qr_display.image_service must not be empty");
        }

        if self.qr_display.image_size == 0 {
            bail!("qr_display.image_size must be greater than 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [gateway]
        endpoint = "http://127.0.0.1:4943/api"
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(MINIMAL).expect("Failed to parse config");

        assert_eq!(config.gateway.request_timeout_ms, 30_000);
        assert!(config.gateway.identity_token.is_none());
        assert_eq!(config.scanner.facing_mode(), FacingMode::Environment);
        assert_eq!(config.scanner.scan_interval_ms, 100);
        assert_eq!(config.scanner.max_results, 1);
        assert_eq!(config.navigation.splash_duration_ms, 2_000);
        assert_eq!(config.qr_display.image_size, 256);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [gateway]
            endpoint = "https://attend.example.org/rpc"
            identity_token = "tok"
            principal = "aaaaa-aa"

            [scanner]
            facing_mode = "user"
            scan_interval_ms = 250

            [logging]
            format = "console"
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).expect("Failed to load config");
        assert_eq!(config.gateway.principal.as_deref(), Some("aaaaa-aa"));
        assert_eq!(config.scanner.facing_mode(), FacingMode::User);
        assert_eq!(config.scanner.scan_interval_ms, 250);
        assert_eq!(config.logging.format, "console");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = Config::from_file(Path::new("/nonexistent/qr-attend.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_rejects_empty_endpoint() {
        let err = Config::from_toml("[gateway]\nendpoint = \"\"").unwrap_err();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn test_rejects_token_without_principal() {
        let toml = "[gateway]\nendpoint = \"http://x\"\nidentity_token = \"t\"";
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_rejects_unknown_facing_mode() {
        let toml = format!("{}\n[scanner]\nfacing_mode = \"sideways\"", MINIMAL);
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("facing mode"));
    }

    #[test]
    fn test_rejects_zero_interval_and_results() {
        let toml = format!("{}\n[scanner]\nscan_interval_ms = 0", MINIMAL);
        assert!(Config::from_toml(&toml).is_err());

        let toml = format!("{}\n[scanner]\nmax_results = 0", MINIMAL);
        assert!(Config::from_toml(&toml).is_err());

        let toml = format!("{}\n[scanner]\nscan_timeout_ms = 0", MINIMAL);
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("scan_timeout_ms"));
    }

    #[test]
    fn test_scanner_options_follow_config() {
        let toml = format!(
            "{}\n[scanner]\nfacing_mode = \"front\"\nscan_interval_ms = 40\nmax_results = 3",
            MINIMAL
        );
        let config = Config::from_toml(&toml).unwrap();
        let options = config.scanner.options();

        assert_eq!(options.facing_mode, FacingMode::User);
        assert_eq!(options.scan_interval, Duration::from_millis(40));
        assert_eq!(options.max_results, 3);
        assert_eq!(config.scanner.scan_timeout(), Duration::from_millis(5_000));
    }

    #[test]
    fn test_rejects_bad_log_level() {
        let toml = format!("{}\n[logging]\nlevel = \"loud\"", MINIMAL);
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }
}
