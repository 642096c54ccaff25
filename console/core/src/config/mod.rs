//! TOML Configuration File Support
//!
//! Configuration for the console, read from
//! `$XDG_CONFIG_HOME/omniserve/console.toml` (typically
//! `~/.config/omniserve/console.toml`).
//!
//! # Configuration Priority
//!
//! Highest first:
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [agent]
//! endpoint = "http://localhost:8787/agent"
//! agent_id = "698599d07551cb7920ffe924"
//! timeout_ms = 30000
//!
//! [knowledge]
//! endpoint = "http://localhost:8787/knowledge"
//! knowledge_base_id = "698599b5de7de278e55d2877"
//!
//! [console]
//! brand_name = "OmniServe"
//! seed_demo_data = true
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Tracks where the configuration last got a value from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Command-line argument
    Cli,
    /// Environment variable
    Env,
    /// TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[agent]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentToml {
    /// Agent endpoint URL
    pub endpoint: Option<String>,
    /// Agent identifier sent with every call
    pub agent_id: Option<String>,
    /// Call timeout in milliseconds (0 = no timeout)
    pub timeout_ms: Option<u64>,
}

/// `[knowledge]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeToml {
    /// Ingestion service base URL
    pub endpoint: Option<String>,
    /// Knowledge base that receives crawled pages and uploads
    pub knowledge_base_id: Option<String>,
}

/// `[console]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleToml {
    /// Brand shown in the welcome message
    pub brand_name: Option<String>,
    /// Load demo conversations at startup
    pub seed_demo_data: Option<bool>,
}

/// Whole configuration file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfigToml {
    /// Agent settings
    pub agent: AgentToml,
    /// Knowledge base settings
    pub knowledge: KnowledgeToml,
    /// Console settings
    pub console: ConsoleToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Effective configuration after all sources are merged
#[derive(Clone, Debug)]
pub struct ConsoleConfig {
    /// Agent endpoint URL
    pub agent_endpoint: String,
    /// Agent identifier
    pub agent_id: String,
    /// Agent call timeout in milliseconds (0 = no timeout)
    pub agent_timeout_ms: u64,
    /// Ingestion service base URL
    pub knowledge_endpoint: String,
    /// Knowledge base identifier
    pub knowledge_base_id: String,
    /// Brand shown to customers
    pub brand_name: String,
    /// Load demo conversations at startup
    pub seed_demo_data: bool,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            agent_endpoint: "http://localhost:8787/agent".to_string(),
            agent_id: "698599d07551cb7920ffe924".to_string(),
            agent_timeout_ms: 30_000,
            knowledge_endpoint: "http://localhost:8787/knowledge".to_string(),
            knowledge_base_id: "698599b5de7de278e55d2877".to_string(),
            brand_name: "OmniServe".to_string(),
            seed_demo_data: true,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ConsoleConfig {
    /// Configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the last applied value came from
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Agent call timeout, `None` when disabled
    #[must_use]
    pub fn agent_timeout(&self) -> Option<Duration> {
        (self.agent_timeout_ms > 0).then(|| Duration::from_millis(self.agent_timeout_ms))
    }

    /// Reject settings the console cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("agent.endpoint", &self.agent_endpoint),
            ("agent.agent_id", &self.agent_id),
            ("knowledge.endpoint", &self.knowledge_endpoint),
            ("knowledge.knowledge_base_id", &self.knowledge_base_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    fn apply_toml(&mut self, toml: ConsoleConfigToml) {
        if let Some(endpoint) = toml.agent.endpoint {
            self.agent_endpoint = endpoint;
        }
        if let Some(agent_id) = toml.agent.agent_id {
            self.agent_id = agent_id;
        }
        if let Some(timeout) = toml.agent.timeout_ms {
            self.agent_timeout_ms = timeout;
        }
        if let Some(endpoint) = toml.knowledge.endpoint {
            self.knowledge_endpoint = endpoint;
        }
        if let Some(kb_id) = toml.knowledge.knowledge_base_id {
            self.knowledge_base_id = kb_id;
        }
        if let Some(brand) = toml.console.brand_name {
            self.brand_name = brand;
        }
        if let Some(seed) = toml.console.seed_demo_data {
            self.seed_demo_data = seed;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let mut touched = false;

        if let Some(endpoint) = lookup("OMNISERVE_AGENT_ENDPOINT") {
            self.agent_endpoint = endpoint;
            touched = true;
        }
        if let Some(agent_id) = lookup("OMNISERVE_AGENT_ID") {
            self.agent_id = agent_id;
            touched = true;
        }
        if let Some(timeout) = lookup("OMNISERVE_AGENT_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(ms) => {
                    self.agent_timeout_ms = ms;
                    touched = true;
                }
                Err(_) => tracing::warn!(value = %timeout, "Ignoring invalid OMNISERVE_AGENT_TIMEOUT_MS"),
            }
        }
        if let Some(endpoint) = lookup("OMNISERVE_KNOWLEDGE_ENDPOINT") {
            self.knowledge_endpoint = endpoint;
            touched = true;
        }
        if let Some(kb_id) = lookup("OMNISERVE_KB_ID") {
            self.knowledge_base_id = kb_id;
            touched = true;
        }
        if let Some(seed) = lookup("OMNISERVE_SEED_DEMO") {
            match parse_bool(&seed) {
                Some(seed) => {
                    self.seed_demo_data = seed;
                    touched = true;
                }
                None => tracing::warn!(value = %seed, "Ignoring invalid OMNISERVE_SEED_DEMO"),
            }
        }

        if touched {
            self.source = ConfigSource::Env;
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/omniserve/console.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("omniserve").join("console.toml"))
}

/// Load configuration from the default path and the process environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or the
/// merged result fails validation.
pub fn load_config() -> Result<ConsoleConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the process environment
///
/// A missing file is not an error; defaults are used.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ConsoleConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with an explicit environment lookup
pub fn load_config_with_env(
    path: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConsoleConfig, ConfigError> {
    let mut config = ConsoleConfig::default();

    if let Some(config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ConsoleConfigToml = toml::from_str(&toml_content)?;
            config.apply_toml(toml_config);
            config.source = ConfigSource::File;

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
            config.config_file_path = Some(config_path);
        } else {
            tracing::debug!(path = %config_path.display(), "Config file not found, using defaults");
        }
    }

    config.apply_env(lookup);
    config.validate()?;
    Ok(config)
}

// =============================================================================
// CLI Overrides
// =============================================================================

/// Values given on the command line
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Agent endpoint override
    pub agent_endpoint: Option<String>,
    /// Agent id override
    pub agent_id: Option<String>,
    /// Disable demo data
    pub no_demo: bool,
}

impl ConfigOverrides {
    /// Apply overrides and re-validate
    pub fn apply(&self, config: &mut ConsoleConfig) -> Result<(), ConfigError> {
        if self.agent_endpoint.is_some() || self.agent_id.is_some() || self.no_demo {
            config.source = ConfigSource::Cli;
        }
        if let Some(ref endpoint) = self.agent_endpoint {
            config.agent_endpoint = endpoint.clone();
        }
        if let Some(ref agent_id) = self.agent_id {
            config.agent_id = agent_id.clone();
        }
        if self.no_demo {
            config.seed_demo_data = false;
        }
        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn toml_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ConsoleConfig::default();
        assert_eq!(config.agent_id, "698599d07551cb7920ffe924");
        assert_eq!(config.knowledge_base_id, "698599b5de7de278e55d2877");
        assert_eq!(config.brand_name, "OmniServe");
        assert!(config.seed_demo_data);
        assert_eq!(config.agent_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("omniserve/console.toml"));
        }
    }

    #[test]
    fn test_parse_partial_toml() {
        let file = toml_file(
            r#"
[agent]
agent_id = "file-agent"
timeout_ms = 0

[console]
seed_demo_data = false
"#,
        );
        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();

        assert_eq!(config.agent_id, "file-agent");
        assert_eq!(config.agent_timeout(), None);
        assert!(!config.seed_demo_data);
        // Untouched values keep their defaults
        assert_eq!(config.agent_endpoint, "http://localhost:8787/agent");
        assert_eq!(config.source(), ConfigSource::File);
        assert_eq!(config.config_file_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_missing_file_graceful() {
        let config =
            load_config_with_env(Some(PathBuf::from("/nonexistent/omniserve/console.toml")), no_env)
                .unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_malformed_toml_error() {
        let file = toml_file("[agent\nendpoint = ");
        let err = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = toml_file(
            r#"
[agent]
agent_id = "file-agent"
endpoint = "http://file/agent"
"#,
        );
        let config = load_config_with_env(
            Some(file.path().to_path_buf()),
            env(&[("OMNISERVE_AGENT_ID", "env-agent"), ("OMNISERVE_SEED_DEMO", "off")]),
        )
        .unwrap();

        assert_eq!(config.agent_id, "env-agent");
        assert_eq!(config.agent_endpoint, "http://file/agent");
        assert!(!config.seed_demo_data);
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_invalid_env_value_ignored() {
        let config =
            load_config_with_env(None, env(&[("OMNISERVE_AGENT_TIMEOUT_MS", "soon")])).unwrap();
        assert_eq!(config.agent_timeout_ms, 30_000);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_empty_id_rejected() {
        let err = load_config_with_env(None, env(&[("OMNISERVE_KB_ID", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("knowledge.knowledge_base_id"));
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config =
            load_config_with_env(None, env(&[("OMNISERVE_AGENT_ID", "env-agent")])).unwrap();
        let overrides = ConfigOverrides {
            agent_id: Some("cli-agent".to_string()),
            no_demo: true,
            ..ConfigOverrides::default()
        };
        overrides.apply(&mut config).unwrap();

        assert_eq!(config.agent_id, "cli-agent");
        assert!(!config.seed_demo_data);
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_no_change() {
        let mut config = ConsoleConfig::default();
        ConfigOverrides::default().apply(&mut config).unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI");
        assert_eq!(ConfigSource::Env.to_string(), "environment");
        assert_eq!(ConfigSource::File.to_string(), "config file");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }
}
