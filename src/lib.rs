/*!
 # MCP Pool Simulator

 A Rust library that simulates a pool of Model Context Protocol (MCP) server
 connections for dashboards, demos and tests.

 ## Overview

 MCP Pool Simulator provides functionality to:
 - Model each server as a small state machine (`disconnected`, `connecting`,
   `connected`, `error`) with simulated connect latency and failures
 - Emit synthetic health checks, traffic metrics, connection-pool drift and
   activity logs while a server is connected
 - Coordinate many simulated servers, connecting or disconnecting them all
   concurrently
 - Import and export server configurations as JSON
 - Push a snapshot of every change to an observer

 Nothing here talks to a network: every "connection" is a set of timers on
 the tokio runtime.

 ## Basic Usage

 ```no_run
 use mcp_pool_sim::{PoolManager, Result};
 use mcp_pool_sim::config::ServerConfig;
 use mcp_pool_sim::server::ServerStatus;

 #[tokio::main]
 async fn main() -> Result<()> {
     let pool = PoolManager::new();

     pool.set_observer(|statuses: Vec<ServerStatus>| {
         for status in &statuses {
             println!("{}: {}", status.id, status.status);
         }
     });

     let docs = ServerConfig::new("docs", "Document Store", "ws://localhost:8080/mcp");
     let search = ServerConfig::new("search", "Semantic Search", "ws://localhost:8081/mcp");
     pool.add_server("docs", docs)?;
     pool.add_server("search", search)?;

     // Connect everything; individual failures end up in each server's status
     pool.connect_all().await;

     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
     println!("{:?}", pool.summary());

     println!("{}", pool.export_all_configurations()?);
     pool.disconnect_all().await;

     Ok(())
 }
 ```

 ## Features

 - **Deterministic runs**: seed the random generators and drive time with
   tokio's paused test clock
 - **Configuration**: JSON or YAML pool files with tunable timings and
   probabilities
 - **Typed observers**: per-server and pool-wide snapshot notifications
 - **Async Support**: Full async/await support

 ## License

 This project is licensed under the terms in the LICENSE file.
*/

pub mod config;
pub mod error;
pub mod server;
pub mod summary;

pub use config::{Config, ImportReport, ServerConfig, SimulationProfile};
pub use error::{Error, Result};
pub use server::{
    ConnectionState, PoolObserver, ServerSimulator, ServerStatus, SimulatorOptions,
    StatusObserver,
};
pub use summary::PoolSummary;

use config::transfer::{self, ExportDocument};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

/// Coordinates a collection of simulated servers.
///
/// Servers are keyed by id. Every change inside any simulator, and every
/// change of membership, is pushed to the pool's observer as a full list of
/// status snapshots ordered by server id.
/// All async methods are instrumented with `tracing` spans.
pub struct PoolManager {
    shared: Arc<PoolShared>,
    /// Template for the simulators this pool creates
    options: SimulatorOptions,
    /// Number of simulators created so far, used to derive per-server seeds
    created: AtomicU64,
}

struct PoolShared {
    servers: Mutex<BTreeMap<String, ServerSimulator>>,
    observer: RwLock<Option<Arc<dyn PoolObserver>>>,
}

/// Observer installed on every simulator of a pool; re-broadcasts to the
/// pool observer.
struct PoolForwarder {
    pool: Weak<PoolShared>,
}

impl StatusObserver for PoolForwarder {
    fn status_changed(&self, status: ServerStatus) {
        if let Some(pool) = self.pool.upgrade() {
            pool.forward(&status);
        }
    }
}

impl PoolShared {
    fn lock_servers(&self) -> MutexGuard<'_, BTreeMap<String, ServerSimulator>> {
        self.servers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn simulators(&self) -> Vec<ServerSimulator> {
        self.lock_servers().values().cloned().collect()
    }

    fn statuses(&self) -> Vec<ServerStatus> {
        self.simulators().iter().map(ServerSimulator::status).collect()
    }

    fn observer(&self) -> Option<Arc<dyn PoolObserver>> {
        self.observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Per-server event first, then the pool-wide list.
    fn forward(&self, status: &ServerStatus) {
        if let Some(observer) = self.observer() {
            observer.server_changed(status);
            observer.statuses_changed(self.statuses());
        }
    }

    fn broadcast(&self) {
        if let Some(observer) = self.observer() {
            observer.statuses_changed(self.statuses());
        }
    }
}

impl PoolManager {
    /// Create an empty pool with default simulation settings
    pub fn new() -> Self {
        Self::build(SimulatorOptions::default())
    }

    /// Create an empty pool whose simulators use `options`.
    ///
    /// When `options.seed` is set, the n-th simulator created by this pool is
    /// seeded with `seed + n`, so a run is reproducible as long as servers are
    /// added in the same order.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigInvalid`] when `options.profile` does not validate.
    pub fn with_options(options: SimulatorOptions) -> Result<Self> {
        options.profile.validate()?;
        Ok(Self::build(options))
    }

    fn build(options: SimulatorOptions) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                servers: Mutex::new(BTreeMap::new()),
                observer: RwLock::new(None),
            }),
            options,
            created: AtomicU64::new(0),
        }
    }

    /// Create a pool from a configuration and register every listed server
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(config), fields(num_servers = config.servers.len()))]
    pub fn from_config(config: Config) -> Result<Self> {
        crate::config::validate_config(&config)?;

        let pool = Self::build(SimulatorOptions {
            profile: config.simulation,
            seed: config.seed,
            ..SimulatorOptions::default()
        });
        for server in config.servers {
            let id = server.id.clone();
            pool.add_server(id, server)?;
        }

        tracing::info!("Created pool from configuration");
        Ok(pool)
    }

    /// Create a pool from a JSON or YAML configuration file
    #[tracing::instrument(skip(path), fields(config_path = ?path.as_ref()))]
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        tracing::info!("Loading configuration from file");
        Self::from_config(Config::from_file(path)?)
    }

    /// Create a pool from a JSON configuration string
    pub fn from_config_str(config: &str) -> Result<Self> {
        Self::from_config(Config::parse_from_str(config)?)
    }

    /// Install the pool observer, replacing any previous one
    pub fn set_observer(&self, observer: impl PoolObserver + 'static) {
        self.set_shared_observer(Arc::new(observer));
    }

    /// Install an observer that is shared with other owners
    pub fn set_shared_observer(&self, observer: Arc<dyn PoolObserver>) {
        *self
            .shared
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    /// Remove the pool observer
    pub fn clear_observer(&self) {
        *self
            .shared
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Register a server under `id` and return its simulator.
    ///
    /// The simulator's id is always `id`; a differing `config.id` is
    /// overwritten. A server already registered under `id` is disconnected
    /// and replaced.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigInvalid`] when the configuration lacks a required field
    /// or carries an extra field reserved by the export format. The pool is
    /// left unchanged.
    pub fn add_server(
        &self,
        id: impl Into<String>,
        mut config: ServerConfig,
    ) -> Result<ServerSimulator> {
        let id = id.into();
        if config.id != id {
            tracing::debug!(server_id = %id, config_id = %config.id, "Using pool key as server id");
            config.id = id.clone();
        }
        crate::config::validate_server_config(&config)?;

        let options = SimulatorOptions {
            seed: self
                .options
                .seed
                .map(|seed| seed.wrapping_add(self.created.fetch_add(1, Ordering::Relaxed))),
            ..self.options.clone()
        };
        let forwarder = Arc::new(PoolForwarder {
            pool: Arc::downgrade(&self.shared),
        });
        let simulator = ServerSimulator::with_observer(config, options, forwarder)?;

        let previous = self
            .shared
            .lock_servers()
            .insert(id.clone(), simulator.clone());

        if let Some(previous) = previous {
            tracing::info!(server_id = %id, "Replacing existing server");
            // Tasks were aborted; nothing left to wait for.
            drop(previous.halt());
        }

        tracing::info!(server_id = %id, name = %simulator.name(), "Server added to pool");
        self.shared.broadcast();
        Ok(simulator)
    }

    /// Disconnect and remove a server.
    ///
    /// Returns `false`, without notifying anyone, when no server is
    /// registered under `id`.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn remove_server(&self, id: &str) -> bool {
        let Some(simulator) = self.get_server(id) else {
            tracing::debug!("Attempted to remove a server that is not in the pool");
            return false;
        };

        simulator.disconnect().await;
        self.shared.lock_servers().remove(id);

        tracing::info!("Server removed from pool");
        self.shared.broadcast();
        true
    }

    /// Get the simulator registered under `id`
    pub fn get_server(&self, id: &str) -> Option<ServerSimulator> {
        self.shared.lock_servers().get(id).cloned()
    }

    /// Ids of all registered servers, in order
    pub fn server_ids(&self) -> Vec<String> {
        self.shared.lock_servers().keys().cloned().collect()
    }

    /// Number of registered servers
    pub fn len(&self) -> usize {
        self.shared.lock_servers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock_servers().is_empty()
    }

    /// Snapshots of every server, ordered by id
    pub fn get_all_statuses(&self) -> Vec<ServerStatus> {
        self.shared.statuses()
    }

    /// Aggregate totals over every server
    pub fn summary(&self) -> PoolSummary {
        PoolSummary::from_statuses(&self.get_all_statuses())
    }

    /// Connect every server concurrently.
    ///
    /// Waits until every attempt has settled. Individual outcomes, including
    /// rejections of servers that were already connected, are returned per
    /// server id; none of them fail the call as a whole.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn connect_all(&self) -> Vec<(String, Result<ConnectionState>)> {
        let simulators = self.shared.simulators();
        tracing::info!(num_servers = simulators.len(), "Connecting all servers");

        let results = join_all(simulators.iter().map(|simulator| async move {
            (simulator.id().to_string(), simulator.connect().await)
        }))
        .await;

        let failed: Vec<&str> = results
            .iter()
            .filter(|(_, result)| !matches!(result, Ok(ConnectionState::Connected)))
            .map(|(id, _)| id.as_str())
            .collect();
        if failed.is_empty() {
            tracing::info!("All servers connected");
        } else {
            tracing::warn!(num_failed = failed.len(), "Some servers did not connect: {:?}", failed);
        }

        results
    }

    /// Disconnect every server concurrently
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn disconnect_all(&self) {
        let simulators = self.shared.simulators();
        tracing::info!(num_servers = simulators.len(), "Disconnecting all servers");

        join_all(simulators.iter().map(|simulator| simulator.disconnect())).await;
    }

    /// Run a connectivity dry run against one server
    ///
    /// # Errors
    ///
    /// [`Error::ServerNotFound`] if no server is registered under `id`.
    #[tracing::instrument(skip(self))]
    pub async fn test_connection(&self, id: &str) -> Result<bool> {
        let simulator = self
            .get_server(id)
            .ok_or_else(|| Error::ServerNotFound(id.to_string()))?;
        Ok(simulator.test_connection().await)
    }

    /// Import server configurations from JSON.
    ///
    /// Accepts one configuration object, an array of them, or a document
    /// produced by [`export_all_configurations`]. Every valid entry is added
    /// to the pool; invalid entries are reported in the returned
    /// [`ImportReport`] and skipped. This never fails as a whole.
    ///
    /// [`export_all_configurations`]: PoolManager::export_all_configurations
    #[tracing::instrument(skip(self, raw), fields(payload_len = raw.len()))]
    pub fn import_configurations(&self, raw: &str) -> ImportReport {
        let entries = match transfer::parse_import(raw) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(%error, "Rejected configuration import");
                return ImportReport {
                    success: 0,
                    errors: vec![error],
                };
            }
        };

        let mut report = ImportReport::default();
        for (index, entry) in entries.into_iter().enumerate() {
            let added = entry.and_then(|config| {
                let id = config.id.clone();
                self.add_server(id, config)
                    .map_err(|e| format!("Configuration {}: {}", index + 1, e))
            });
            match added {
                Ok(_) => report.success += 1,
                Err(error) => report.errors.push(error),
            }
        }

        tracing::info!(
            success = report.success,
            num_errors = report.errors.len(),
            "Imported configurations"
        );
        report
    }

    /// Exported configurations of every server
    pub fn export_document(&self) -> ExportDocument {
        let configurations = self
            .shared
            .simulators()
            .iter()
            .map(ServerSimulator::export_config)
            .collect();
        ExportDocument::new(configurations, self.options.clock.now())
    }

    /// Export every server's configuration as pretty-printed JSON
    pub fn export_all_configurations(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_document())?)
    }
}

impl Default for PoolManager {
    fn default() -> Self {
        Self::new()
    }
}
