use crate::config::types::{Config, DispatchConfig, LoggingConfig};
use crate::registry::{DontLog, ErrorKind};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_dispatch_config(&config.dispatch)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates dispatch configuration
fn validate_dispatch_config(config: &DispatchConfig) -> Result<(), ConfigError> {
    validate_sender_name(&config.sender_name)?;
    config.dont_log_kinds()?;
    Ok(())
}

/// Validates logging configuration
fn validate_logging_config(config: &LoggingConfig) -> Result<(), ConfigError> {
    if config.filter.trim().is_empty() {
        return Err(ConfigError::Validation(
            "logging filter cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a sender label: non-empty, alphanumeric plus '-' and '_'
fn validate_sender_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "sender_name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "sender_name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            name
        )));
    }

    Ok(())
}

impl DispatchConfig {
    /// Parses the configured `dont-log` names
    ///
    /// # Returns
    ///
    /// * `Ok(DontLog)` - The suppression set
    /// * `Err(ConfigError::UnknownErrorKind)` - A name is not a known kind
    pub fn dont_log_kinds(&self) -> Result<DontLog, ConfigError> {
        let mut kinds = Vec::with_capacity(self.dont_log.len());
        for name in &self.dont_log {
            let kind = ErrorKind::from_config_name(name)
                .ok_or_else(|| ConfigError::UnknownErrorKind(name.clone()))?;
            kinds.push(kind);
        }
        Ok(DontLog::from_kinds(kinds))
    }
}
