use crate::config::{Config, ServerConfig};
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashSet;

/// Fields every server configuration must carry.
pub const REQUIRED_FIELDS: [&str; 3] = ["id", "name", "endpoint"];

/// Keys written next to every exported configuration. A server configuration
/// may not carry them as extra fields.
pub const RESERVED_FIELDS: [&str; 2] = ["exportedAt", "version"];

/// Checks a raw JSON entry for the required fields.
///
/// A field counts as present when it is a string with non-whitespace content.
pub fn has_required_fields(entry: &Value) -> bool {
    REQUIRED_FIELDS.iter().all(|field| {
        entry
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty())
    })
}

/// Validates a server configuration
pub fn validate_server_config(config: &ServerConfig) -> Result<()> {
    let missing: Vec<&str> = [
        ("id", &config.id),
        ("name", &config.name),
        ("endpoint", &config.endpoint),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| field)
    .collect();

    if !missing.is_empty() {
        return Err(Error::ConfigInvalid(format!(
            "Server '{}' is missing required fields: {}",
            config.id,
            missing.join(", ")
        )));
    }

    let reserved = RESERVED_FIELDS
        .iter()
        .find(|field| config.extra.contains_key(**field));
    if let Some(field) = reserved {
        return Err(Error::ConfigInvalid(format!(
            "Server '{}' uses reserved field '{}'",
            config.id, field
        )));
    }

    Ok(())
}

/// Full configuration validation
pub fn validate_config(config: &Config) -> Result<()> {
    config.simulation.validate()?;

    let mut seen = HashSet::new();
    for server in &config.servers {
        validate_server_config(server)?;
        if !seen.insert(server.id.as_str()) {
            return Err(Error::ConfigInvalid(format!(
                "Duplicate server id '{}'",
                server.id
            )));
        }
    }

    Ok(())
}
