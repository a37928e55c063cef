//! Configuration validation utilities.

use trellis_core::SandboxScheme;

use super::error::{ConfigError, ConfigResult};
use super::schema::{EngineConfig, LogOutput, LoggingConfig, TrellisConfig, WebviewConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &TrellisConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_webview_config(&config.webview)?;
    validate_engine_config(&config.engine)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    Ok(())
}

fn validate_webview_config(webview: &WebviewConfig) -> ConfigResult<()> {
    if webview.fetch_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "webview.fetch_timeout_ms must be greater than 0",
        ));
    }

    if !SandboxScheme::is_valid_scheme(&webview.sandbox_scheme) {
        return Err(ConfigError::InvalidScheme(webview.sandbox_scheme.clone()));
    }

    Ok(())
}

fn validate_engine_config(engine: &EngineConfig) -> ConfigResult<()> {
    if engine.call_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "engine.call_timeout_ms must be greater than 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&TrellisConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = TrellisConfig::default();
        config.webview.fetch_timeout_ms = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        let mut config = TrellisConfig::default();
        config.engine.call_timeout_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_scheme_rejected() {
        let mut config = TrellisConfig::default();
        config.webview.sandbox_scheme = "not a scheme".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidScheme(scheme)) if scheme == "not a scheme"
        ));
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = TrellisConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some(PathBuf::from("trellis.log"));
        assert!(validate_config(&config).is_ok());
    }
}
