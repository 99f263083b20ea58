//! Configuration system (layered: code > env > config file).

pub mod server;

pub use server::{ServerConfig, TransportConfig, TransportKind};

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ToolmeshError;
use crate::util::retry::RetryPolicy;

const CONFIG_FILE_NAME: &str = "toolmesh.toml";

/// Agent loop limits and retry bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub max_iterations: usize,
    /// Retries for completion requests and tool calls.
    pub completion_retries: u32,
    /// Retries for tool-server connection attempts.
    pub connect_retries: u32,
    pub retry_base_ms: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            completion_retries: 3,
            connect_retries: 2,
            retry_base_ms: 1000,
        }
    }
}

impl AgentSettings {
    pub fn completion_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.completion_retries,
            Duration::from_millis(self.retry_base_ms),
        )
    }

    pub fn reconnect_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.connect_retries,
            Duration::from_millis(self.retry_base_ms),
        )
    }
}

/// Top-level configuration file.
///
/// ```toml
/// [agent]
/// max_iterations = 8
///
/// [[servers]]
/// name = "search"
/// type = "ws"
/// url = "wss://example.com/ws"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub agent: AgentSettings,
    pub servers: Vec<ServerConfig>,
}

impl MeshConfig {
    /// Parse a TOML document and validate every server entry.
    pub fn from_toml_str(raw: &str) -> Result<Self, ToolmeshError> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| ToolmeshError::Configuration(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ToolmeshError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Per-user config location, e.g. `~/.config/toolmesh/toolmesh.toml`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "toolmesh", "toolmesh")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load the per-user file when present, then apply environment overrides.
    pub fn load_default() -> Result<Self, ToolmeshError> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `TOOLMESH_*` environment variables (a `.env` file is honoured).
    pub fn apply_env_overrides(&mut self) -> Result<(), ToolmeshError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ToolmeshError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TOOLMESH_MAX_ITERATIONS") {
            self.agent.max_iterations = parse_override("TOOLMESH_MAX_ITERATIONS", &value)?;
        }
        if let Some(value) = lookup("TOOLMESH_COMPLETION_RETRIES") {
            self.agent.completion_retries =
                parse_override("TOOLMESH_COMPLETION_RETRIES", &value)?;
        }
        if let Some(value) = lookup("TOOLMESH_CONNECT_RETRIES") {
            self.agent.connect_retries = parse_override("TOOLMESH_CONNECT_RETRIES", &value)?;
        }
        if let Some(value) = lookup("TOOLMESH_RETRY_BASE_MS") {
            self.agent.retry_base_ms = parse_override("TOOLMESH_RETRY_BASE_MS", &value)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ToolmeshError> {
        if self.agent.max_iterations == 0 {
            return Err(ToolmeshError::Configuration(
                "max_iterations must be at least 1".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for server in &self.servers {
            server.validate()?;
            if !seen.insert(server.name.as_str()) {
                return Err(ToolmeshError::Configuration(format!(
                    "Duplicate tool-server name '{}'",
                    server.name
                )));
            }
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ToolmeshError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ToolmeshError::Configuration(format!("{key}={value}: {e}")))
}

/// Credentials and endpoint for the bundled OpenAI-compatible client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Load `OPENAI_API_KEY` / `OPENAI_BASE_URL` (a `.env` file is honoured).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: std::env::var("OPENAI_BASE_URL").ok(),
        }
    }

    pub fn require_api_key(&self) -> Result<&str, ToolmeshError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ToolmeshError::Authentication("Missing OPENAI_API_KEY".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn toml_document_loads_servers_and_agent_settings() {
        let config = MeshConfig::from_toml_str(
            r#"
            [agent]
            max_iterations = 4

            [[servers]]
            name = "fs"
            type = "stdio"
            command = "node"
            args = ["read.js"]

            [[servers]]
            name = "search"
            type = "ws"
            url = "wss://example.com/ws"
            "#,
        )
        .unwrap();

        assert_eq!(config.agent.max_iterations, 4);
        assert_eq!(config.agent.completion_retries, 3);
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[1].kind(), TransportKind::Websocket);
    }

    #[test]
    fn duplicate_server_names_are_rejected() {
        let err = MeshConfig::from_toml_str(
            r#"
            [[servers]]
            name = "dup"
            type = "http"
            url = "https://a.example.com/mcp"

            [[servers]]
            name = "dup"
            type = "sse"
            url = "https://b.example.com/sse"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ToolmeshError::Configuration(message) if message.contains("dup")));
    }

    #[test]
    fn overrides_replace_agent_settings() {
        let env = HashMap::from([
            ("TOOLMESH_MAX_ITERATIONS", "3"),
            ("TOOLMESH_RETRY_BASE_MS", "10"),
        ]);
        let mut config = MeshConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.agent.max_iterations, 3);
        assert_eq!(
            config.agent.completion_policy().backoff.delay(2),
            Duration::from_millis(20)
        );
    }

    #[test]
    fn malformed_override_is_a_configuration_error() {
        let mut config = MeshConfig::default();
        let err = config
            .apply_overrides(|key| (key == "TOOLMESH_MAX_ITERATIONS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ToolmeshError::Configuration(message) if message.contains("many")));
    }
}
