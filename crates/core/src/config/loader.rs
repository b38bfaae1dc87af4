use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;
use thiserror::Error;

use super::types::Config;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Config parse error: {0}")]
    ParseError(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("HARVESTARR_").split("_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config =
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Cross-field validation beyond what serde enforces.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if let Some(jackett) = &config.jackett {
        if jackett.url.is_empty() {
            return Err(ConfigError::Invalid("jackett.url must not be empty".to_string()));
        }
        if jackett.api_key.is_empty() {
            return Err(ConfigError::Invalid(
                "jackett.api_key must not be empty".to_string(),
            ));
        }
    }

    if let Some(qb) = &config.qbittorrent {
        if qb.url.is_empty() {
            return Err(ConfigError::Invalid(
                "qbittorrent.url must not be empty".to_string(),
            ));
        }
    }

    if config.queue.max_attempts == 0 {
        return Err(ConfigError::Invalid(
            "queue.max_attempts must be at least 1".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&config.matching.lexical_threshold)
        || !(0.0..=1.0).contains(&config.matching.neural_threshold)
    {
        return Err(ConfigError::Invalid(
            "matching thresholds must be within 0.0-1.0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[queue]
max_attempts = 3
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.queue.max_attempts, 3);
    }

    #[test]
    fn test_load_config_from_str_rejects_zero_attempts() {
        let toml = r#"
[queue]
max_attempts = 0
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_config_rejects_empty_api_key() {
        let toml = r#"
[jackett]
url = "http://localhost:9117"
api_key = ""
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_config_rejects_bad_threshold() {
        let toml = r#"
[matching]
lexical_threshold = 1.5
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[database]
path = "/tmp/test.db"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.database.path.to_string_lossy(), "/tmp/test.db");
    }
}
