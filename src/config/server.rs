//! Tool-server connection settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ToolmeshError;

/// Transport used to reach a tool-server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransportKind {
    Stdio,
    #[strum(serialize = "websocket", serialize = "ws")]
    Websocket,
    Sse,
    Http,
}

/// Transport-specific settings, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Child process speaking JSON-RPC over stdin/stdout.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
    },
    #[serde(alias = "ws")]
    Websocket { url: String },
    Sse {
        url: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
    },
    Http {
        url: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
    },
}

impl TransportConfig {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Stdio { .. } => TransportKind::Stdio,
            Self::Websocket { .. } => TransportKind::Websocket,
            Self::Sse { .. } => TransportKind::Sse,
            Self::Http { .. } => TransportKind::Http,
        }
    }

    /// Target URL for network transports.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Stdio { .. } => None,
            Self::Websocket { url } | Self::Sse { url, .. } | Self::Http { url, .. } => Some(url),
        }
    }
}

/// One tool-server entry. `name` is the server id used by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    #[serde(flatten)]
    pub transport: TransportConfig,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, transport: TransportConfig) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }

    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self::new(
            name,
            TransportConfig::Stdio {
                command: command.into(),
                args,
                env: BTreeMap::new(),
            },
        )
    }

    pub fn websocket(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(name, TransportConfig::Websocket { url: url.into() })
    }

    pub fn sse(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(
            name,
            TransportConfig::Sse {
                url: url.into(),
                headers: BTreeMap::new(),
            },
        )
    }

    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(
            name,
            TransportConfig::Http {
                url: url.into(),
                headers: BTreeMap::new(),
            },
        )
    }

    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Check the id and URL shape before any connection attempt.
    pub fn validate(&self) -> Result<(), ToolmeshError> {
        if self.name.trim().is_empty() {
            return Err(ToolmeshError::Configuration(
                "Tool-server name must not be empty".into(),
            ));
        }

        if let TransportConfig::Stdio { command, .. } = &self.transport {
            if command.trim().is_empty() {
                return Err(ToolmeshError::Configuration(format!(
                    "Tool-server '{}' has an empty command",
                    self.name
                )));
            }
        }

        if let Some(url) = self.transport.url() {
            reqwest::Url::parse(url).map_err(|e| {
                ToolmeshError::Configuration(format!(
                    "Tool-server '{}' has an invalid url '{url}': {e}",
                    self.name
                ))
            })?;
        }

        Ok(())
    }
}
