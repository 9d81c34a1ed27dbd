use crate::config::profile::SimulationProfile;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Configuration for a single simulated MCP server.
///
/// `id`, `name` and `endpoint` are required. Any fields the simulator does not
/// know about are kept in `extra` so that an import followed by an export
/// hands them back unchanged.
///
/// # Examples
///
/// ```
/// use mcp_pool_sim::config::ServerConfig;
///
/// let config = ServerConfig::new("docs", "Document Store", "ws://localhost:8080/mcp")
///     .with_auth_method("bearer")
///     .with_description("Primary document retrieval server");
///
/// assert_eq!(config.id, "docs");
/// assert_eq!(config.auth_method.as_deref(), Some("bearer"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Unique identifier of the server within a pool.
    pub id: String,

    /// Human readable display name, used in log messages.
    pub name: String,

    /// Endpoint URI the server pretends to connect to.
    pub endpoint: String,

    /// Authentication method label (for example `none`, `api-key`, `bearer`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<String>,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Additional fields carried through import and export untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerConfig {
    /// Creates a configuration with the three required fields.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            endpoint: endpoint.into(),
            auth_method: None,
            description: None,
            extra: Map::new(),
        }
    }

    /// Sets the authentication method label.
    pub fn with_auth_method(mut self, auth_method: impl Into<String>) -> Self {
        self.auth_method = Some(auth_method.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Main configuration document for a simulated pool.
///
/// # JSON Schema
///
/// ```json
/// {
///   "servers": [
///     { "id": "docs", "name": "Document Store", "endpoint": "ws://localhost:8080/mcp" }
///   ],
///   "simulation": {
///     "connectFailureRate": 0.1,
///     "metricsIntervalMs": 1000
///   },
///   "seed": 42
/// }
/// ```
///
/// Every key is optional. Missing simulation settings fall back to
/// [`SimulationProfile::default`]. The same shape is accepted as YAML when
/// loaded from a `.yaml` or `.yml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Servers to register when the pool is built.
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    /// Timing and probability settings shared by every simulator in the pool.
    #[serde(default)]
    pub simulation: SimulationProfile,

    /// Seed for reproducible runs. Unset means seeded from entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Config {
    /// Loads a configuration from a file path.
    ///
    /// Files ending in `.yaml` or `.yml` are parsed as YAML, everything else as
    /// JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] if the file cannot be read or does not
    /// match the expected schema.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read config file: {}", e)))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::parse_from_yaml_str(&content)
        } else {
            Self::parse_from_str(&content)
        }
    }

    /// Parses a configuration from a JSON string.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))
    }

    /// Parses a configuration from a YAML string.
    pub fn parse_from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse YAML config: {}", e)))
    }
}
