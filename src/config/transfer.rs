//! Import and export of server configurations.
//!
//! Exports wrap each configuration with the time it was taken and a format
//! version. Imports accept a single configuration, an array of them, or a
//! whole export document, and validate every entry on its own so that one bad
//! entry does not sink the rest.

use crate::config::ServerConfig;
use crate::config::validator::{RESERVED_FIELDS, has_required_fields};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Format version written into every export.
pub const EXPORT_VERSION: &str = "1.0";

/// One server configuration as written by an export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedConfig {
    #[serde(flatten)]
    pub config: ServerConfig,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

impl ExportedConfig {
    pub fn new(config: ServerConfig, exported_at: DateTime<Utc>) -> Self {
        Self {
            config,
            exported_at,
            version: EXPORT_VERSION.to_string(),
        }
    }
}

/// Document produced by exporting a whole pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub configurations: Vec<ExportedConfig>,
    pub exported_at: DateTime<Utc>,
    pub total_servers: usize,
    pub version: String,
}

impl ExportDocument {
    pub fn new(configurations: Vec<ExportedConfig>, exported_at: DateTime<Utc>) -> Self {
        Self {
            total_servers: configurations.len(),
            configurations,
            exported_at,
            version: EXPORT_VERSION.to_string(),
        }
    }
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Number of configurations that were accepted.
    pub success: usize,
    /// One message per rejected entry, or a single message for a payload that
    /// could not be parsed at all.
    pub errors: Vec<String>,
}

/// Result of validating one import entry: the parsed configuration or the
/// message describing why it was rejected.
pub type ImportEntry = std::result::Result<ServerConfig, String>;

/// Parses an import payload into per-entry results.
///
/// Entry numbers in the error messages are 1-based. An unparseable payload is
/// reported as `Err` with the `Invalid JSON: ...` message.
pub fn parse_import(raw: &str) -> std::result::Result<Vec<ImportEntry>, String> {
    let payload: Value =
        serde_json::from_str(raw).map_err(|e| format!("Invalid JSON: {}", e))?;

    let entries = match payload {
        Value::Array(entries) => entries,
        Value::Object(mut object) if object.get("configurations").is_some_and(Value::is_array) => {
            match object.remove("configurations") {
                Some(Value::Array(entries)) => entries,
                _ => Vec::new(),
            }
        }
        other => vec![other],
    };

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| parse_entry(index + 1, entry))
        .collect())
}

fn parse_entry(number: usize, mut entry: Value) -> ImportEntry {
    if !has_required_fields(&entry) {
        return Err(format!("Configuration {}: Missing required fields", number));
    }

    if let Value::Object(object) = &mut entry {
        for key in RESERVED_FIELDS {
            object.remove(key);
        }
    }

    serde_json::from_value(entry).map_err(|e| format!("Configuration {}: {}", number, e))
}
