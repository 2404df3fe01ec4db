//! YAML configuration loading for the sentiment service.
//!
//! Loads [`ServerConfig`] from a YAML file on disk, falling back to defaults
//! when no file is specified. Credentials may be supplied through the
//! environment instead of the file.

use sentiscope_core::{EngineConfig, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding `engine.credentials.api_token`.
pub const API_TOKEN_ENV: &str = "SENTISCOPE_API_TOKEN";

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Apply an API token taken from the environment, if one is set.
    #[must_use]
    pub fn with_api_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.engine.credentials.api_token = token;
        }
        self
    }
}

/// Load a [`ServerConfig`] from a YAML file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
    let config: ServerConfig = serde_yaml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {}", e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentiscope_core::TextStrategy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper to write YAML to a temp file and return the path.
    fn write_yaml(yaml: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_config_full() {
        let yaml = r#"
listen_addr: "127.0.0.1:9090"
engine:
  credentials:
    api_token: "hf_file_token"
    translation_token: "session"
  endpoints:
    text_sentiment: "http://localhost:7000/sentiment"
  timeouts:
    request_timeout_ms: 2000
  text:
    strategy: prompt
    confidence_threshold: 0.8
  language:
    enabled: false
  image:
    enabled: true
    caption_negative: ["gloomy"]
  batch:
    size: 4
    cooldown_ms: 250
logging:
  level: debug
  format: json
"#;
        let f = write_yaml(yaml);
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9090");
        assert_eq!(config.engine.credentials.api_token, "hf_file_token");
        assert_eq!(
            config.engine.endpoints.text_sentiment,
            "http://localhost:7000/sentiment"
        );
        assert_eq!(config.engine.timeouts.request_timeout_ms, 2000);
        assert_eq!(config.engine.timeouts.connect_timeout_ms, 5000);
        assert_eq!(config.engine.text.strategy, TextStrategy::Prompt);
        assert!(!config.engine.language.enabled);
        assert_eq!(config.engine.image.caption_negative, vec!["gloomy"]);
        assert!(!config.engine.image.caption_positive.is_empty());
        assert_eq!(config.engine.batch.size, 4);
        assert_eq!(config.logging.format, "json");
        assert!(config.engine.validate().is_ok());
    }

    #[test]
    fn test_load_config_empty_mapping_uses_defaults() {
        let f = write_yaml("{}\n");
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.engine.batch.size, 2);
        assert_eq!(config.engine.batch.cooldown_ms, 1000);
        assert_eq!(config.logging.level, "info");
        // no token in the file: the engine refuses to start
        assert!(config.engine.validate().is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let f = write_yaml("not: [valid: yaml: {{{}}}");
        let result = load_config(f.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_api_token_override() {
        let config = ServerConfig::default().with_api_token_override(Some("hf_env".into()));
        assert_eq!(config.engine.credentials.api_token, "hf_env");

        let config = config.with_api_token_override(Some("  ".into()));
        assert_eq!(config.engine.credentials.api_token, "hf_env");

        let config = config.with_api_token_override(None);
        assert_eq!(config.engine.credentials.api_token, "hf_env");
    }
}
