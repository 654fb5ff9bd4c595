//! YAML configuration with per-field defaults.
//!
//! Every field has a default, so a missing file or a partial file both
//! yield a runnable configuration; only an unparsable file is an error.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

// -----------------------------------------------------------------------------
// Config (root)
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default = "default_sessions_file")]
    pub sessions_file: PathBuf,
    #[serde(default = "default_final_room")]
    pub final_room: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            sessions_file: default_sessions_file(),
            final_room: default_final_room(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the defaults; an unparsable file is an error.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let path = Path::new(path);
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        serde_yaml::from_str(&contents).map_err(ConfigError::Yaml)
    }
}

fn default_sessions_file() -> PathBuf {
    PathBuf::from("user_sessions.json")
}

fn default_final_room() -> u32 {
    5
}

// -----------------------------------------------------------------------------
// GeneratorConfig
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_seconds: default_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_timeout() -> u64 {
    40
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

// -----------------------------------------------------------------------------
// ConfigError
// -----------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sessions_file, PathBuf::from("user_sessions.json"));
        assert_eq!(config.final_room, 5);
        assert_eq!(config.generator.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.generator.model, "llama-3.3-70b-versatile");
        assert_eq!(config.generator.api_key_env, "GROQ_API_KEY");
        assert_eq!(config.generator.timeout_seconds, 40);
        assert_eq!(config.generator.max_tokens, 1024);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let tmp_dir = TempDir::new().unwrap();
        let missing_path = tmp_dir.path().join("missing-config.yaml");
        let config = Config::load(missing_path.to_str().unwrap()).unwrap();
        assert_eq!(config.final_room, 5);
        assert_eq!(config.generator.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_load_valid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
generator:
  base_url: "http://localhost:9999/v1"
  model: "test-model"
  timeout_seconds: 5
sessions_file: "castle/sessions.json"
final_room: 3
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.generator.base_url, "http://localhost:9999/v1");
        assert_eq!(config.generator.model, "test-model");
        assert_eq!(config.generator.timeout_seconds, 5);
        assert_eq!(config.sessions_file, PathBuf::from("castle/sessions.json"));
        assert_eq!(config.final_room, 3);
    }

    #[test]
    fn test_load_partial_yaml_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
final_room: 7
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.final_room, 7);
        assert_eq!(config.sessions_file, PathBuf::from("user_sessions.json")); // default
        assert_eq!(config.generator.timeout_seconds, 40); // default
    }

    #[test]
    fn test_load_invalid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(file.path().to_str().unwrap());
        assert!(result.is_err());
    }
}
