//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{IngotConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &IngotConfig) -> ConfigResult<()> {
    validate_command_prefix(&config.command_prefix)?;
    validate_owners(config)?;
    validate_logging(&config.logging)?;
    Ok(())
}

fn validate_command_prefix(prefix: &str) -> ConfigResult<()> {
    if prefix.is_empty() {
        return Err(ConfigError::missing_field("command_prefix"));
    }
    if prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "Command prefix cannot contain whitespace: {prefix:?}"
        )));
    }
    Ok(())
}

fn validate_owners(config: &IngotConfig) -> ConfigResult<()> {
    for (protocol, id) in &config.owners {
        if protocol.trim().is_empty() {
            return Err(ConfigError::validation("Owner protocol cannot be empty"));
        }
        if id.trim().is_empty() {
            return Err(ConfigError::missing_field(format!("owners.{protocol}")));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.filters.keys().any(|module| module.trim().is_empty()) {
        return Err(ConfigError::validation(
            "Logging filter module names cannot be empty",
        ));
    }

    if logging.output == LogOutput::File {
        if logging.file_path.is_none() {
            return Err(ConfigError::missing_field("logging.file_path"));
        }
        if logging.max_files == 0 {
            return Err(ConfigError::validation(
                "logging.max_files must be greater than 0",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&IngotConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_command_prefix() {
        let mut config = IngotConfig::default();
        config.command_prefix = String::new();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.command_prefix = "! ".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        config.command_prefix = "!!".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_owner_ids() {
        let mut config = IngotConfig::default();
        config.owners.insert("onebot".into(), "10001".into());
        assert!(validate_config(&config).is_ok());

        config.owners.insert("console".into(), "  ".into());
        let err = validate_config(&config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required configuration field: owners.console"
        );
    }

    #[test]
    fn test_validate_file_output() {
        let mut config = IngotConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("logs/ingot.log".into());
        assert!(validate_config(&config).is_ok());

        config.logging.max_files = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_filters() {
        let mut config = IngotConfig::default();
        config
            .logging
            .filters
            .insert("ingot_command".into(), LogLevel::Debug);
        assert!(validate_config(&config).is_ok());

        config.logging.filters.insert(" ".into(), LogLevel::Trace);
        assert!(validate_config(&config).is_err());
    }
}
