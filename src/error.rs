/// Error handling module for the MCP pool simulator.
///
/// Simulated failures (a connect attempt that lands in `error`, a degraded
/// health check, a random request error) are part of a server's state and are
/// never reported through this type. `Error` covers the things a caller can
/// actually get wrong: bad configuration, unknown servers, and lifecycle
/// misuse.
///
/// # Example
///
/// ```
/// use mcp_pool_sim::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Operation succeeded"),
///         Err(Error::ServerNotFound(id)) => println!("Server '{}' is not in the pool", id),
///         Err(Error::AlreadyConnected(id)) => println!("Server '{}' is already connected", id),
///         Err(e) => println!("Error: {}", e),
///     }
/// }
/// ```
use thiserror::Error;

/// Errors that can occur in the mcp-pool-sim library.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to parse configuration from a file or string.
    ///
    /// This error occurs when:
    /// - The configuration document is malformed JSON or YAML
    /// - The configuration file cannot be read
    /// - Field types are incorrect
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parsed but contains invalid values.
    ///
    /// This error occurs when:
    /// - A server entry lacks an id, name or endpoint
    /// - A server entry uses a field name reserved by the export format
    /// - A simulation probability lies outside `[0, 1]`
    /// - A sampling range is empty or an interval is zero
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Requested server is not held by the pool.
    #[error("Server not found: {0}")]
    ServerNotFound(String),

    /// `connect()` was called while the server was connecting or connected.
    #[error("Server already connected or connecting: {0}")]
    AlreadyConnected(String),

    /// Error in serializing or deserializing data.
    ///
    /// This error occurs when:
    /// - An export document can't be rendered as JSON
    /// - A configuration can't be converted to or from JSON values
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for mcp-pool-sim operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
