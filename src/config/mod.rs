//! Configuration module for the MCP pool simulator.
//!
//! This module handles server configurations, the simulation profile that
//! drives every simulator's timers and probabilities, validation, and the
//! JSON import/export format.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use mcp_pool_sim::config::Config;
//!
//! let config = Config::from_file("pool.yaml").unwrap();
//! println!("Loaded configuration with {} servers", config.servers.len());
//! ```
//!
//! Creating a configuration programmatically:
//!
//! ```
//! use mcp_pool_sim::config::{Config, ServerConfig, SimulationProfile};
//!
//! let config = Config {
//!     servers: vec![ServerConfig::new("docs", "Document Store", "ws://localhost:8080/mcp")],
//!     simulation: SimulationProfile::default(),
//!     seed: Some(42),
//! };
//! assert!(mcp_pool_sim::config::validate_config(&config).is_ok());
//! ```
mod parser;
pub mod profile;
pub mod transfer;
pub mod validator;

pub use parser::{Config, ServerConfig};
pub use profile::{SimulationProfile, Span};
pub use transfer::{EXPORT_VERSION, ExportDocument, ExportedConfig, ImportReport};
pub use validator::{validate_config, validate_server_config};
