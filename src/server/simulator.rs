use crate::config::{ExportedConfig, ServerConfig, SimulationProfile, validate_server_config};
use crate::error::Result;
use crate::server::clock::{Clock, RuntimeClock};
use crate::server::lifecycle::SimState;
use crate::server::monitor::{self, ActivityTasks};
use crate::server::observer::StatusObserver;
use crate::server::status::{ConnectionState, LogEntry, ServerStatus};
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Settings shared by simulators built together
#[derive(Debug, Clone)]
pub struct SimulatorOptions {
    /// Timings and probabilities
    pub profile: SimulationProfile,
    /// Seed for the simulator's random generator; `None` seeds from entropy
    pub seed: Option<u64>,
    /// Source of timestamps
    pub clock: Arc<dyn Clock>,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            profile: SimulationProfile::default(),
            seed: None,
            clock: Arc::new(RuntimeClock::new()),
        }
    }
}

/// A simulated MCP server connection.
///
/// The handle is cheap to clone; clones share the same simulated server.
/// Connecting requires a running tokio runtime, since the periodic activity
/// (health checks, metrics, synthetic logs, pool drift) runs on spawned tasks.
///
/// # Examples
///
/// ```no_run
/// use mcp_pool_sim::config::ServerConfig;
/// use mcp_pool_sim::server::{ConnectionState, ServerSimulator, SimulatorOptions};
///
/// # #[tokio::main]
/// # async fn main() -> mcp_pool_sim::Result<()> {
/// let config = ServerConfig::new("docs", "Document Store", "ws://localhost:8080/mcp");
/// let server = ServerSimulator::new(config, SimulatorOptions::default())?;
///
/// match server.connect().await? {
///     ConnectionState::Connected => println!("connected"),
///     other => println!("connect settled in {}", other),
/// }
///
/// let status = server.status();
/// println!("pool: {} connections", status.connection_pool.total());
///
/// server.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ServerSimulator {
    inner: Arc<SimulatorInner>,
}

pub(crate) struct SimulatorInner {
    config: ServerConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<SimState>,
    tasks: Mutex<ActivityTasks>,
    observer: Option<Arc<dyn StatusObserver>>,
}

impl ServerSimulator {
    /// Create a new simulator in the `disconnected` state
    ///
    /// # Errors
    ///
    /// [`Error::ConfigInvalid`](crate::Error::ConfigInvalid) when the
    /// configuration or the simulation profile does not validate.
    pub fn new(config: ServerConfig, options: SimulatorOptions) -> Result<Self> {
        Self::build(config, options, None)
    }

    /// Create a new simulator that reports every change to `observer`
    pub fn with_observer(
        config: ServerConfig,
        options: SimulatorOptions,
        observer: Arc<dyn StatusObserver>,
    ) -> Result<Self> {
        Self::build(config, options, Some(observer))
    }

    fn build(
        config: ServerConfig,
        options: SimulatorOptions,
        observer: Option<Arc<dyn StatusObserver>>,
    ) -> Result<Self> {
        validate_server_config(&config)?;
        options.profile.validate()?;

        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = SimState::new(&config, options.profile, rng);

        Ok(Self {
            inner: Arc::new(SimulatorInner {
                config,
                clock: options.clock,
                state: Mutex::new(state),
                tasks: Mutex::new(ActivityTasks::default()),
                observer,
            }),
        })
    }

    /// Get the server ID
    pub fn id(&self) -> &str {
        self.inner.id()
    }

    /// Get the server name
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Snapshot of the current status
    pub fn status(&self) -> ServerStatus {
        self.inner.lock_state().status().clone()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.inner.lock_state().state()
    }

    /// Up to `limit` log entries, newest first
    pub fn recent_logs(&self, limit: usize) -> Vec<LogEntry> {
        self.inner
            .lock_state()
            .status()
            .logs
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Drops every log entry
    pub fn clear_logs(&self) {
        self.inner.transition(|state, _| {
            state.clear_logs();
            ((), true)
        });
    }

    /// Whether periodic activity tasks are currently running
    pub fn has_active_timers(&self) -> bool {
        self.inner.lock_tasks().is_running()
    }

    /// Connect to the simulated server.
    ///
    /// Waits for the simulated network latency, then settles in `connected`
    /// (starting the periodic activity) or `error`. If [`disconnect`] is
    /// called while the attempt is pending, the attempt is dropped and
    /// `disconnected` is returned.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyConnected`](crate::Error::AlreadyConnected) when the
    /// server is already connecting or connected. Nothing is changed in that
    /// case.
    ///
    /// [`disconnect`]: ServerSimulator::disconnect
    #[tracing::instrument(skip(self), fields(server_id = %self.id()))]
    pub async fn connect(&self) -> Result<ConnectionState> {
        tracing::info!(endpoint = %self.inner.config.endpoint, "Connecting to simulated server");

        let (epoch, delay) = self.inner.transition(|state, now| match state.begin_connect(now) {
            Ok(epoch) => (Ok((epoch, state.connect_delay())), true),
            Err(e) => (Err(e), false),
        })?;

        tracing::debug!(delay_ms = delay.as_millis() as u64, "Simulating connection latency");
        tokio::time::sleep(delay).await;

        let outcome = self.inner.transition(|state, now| {
            let outcome = state.finish_connect(epoch, now);
            let changed = outcome.is_some();
            (outcome, changed)
        });

        match outcome {
            Some(ConnectionState::Connected) => {
                self.inner.start_activity(epoch);
                tracing::info!("Simulated server connected");
                Ok(ConnectionState::Connected)
            }
            Some(state) => {
                tracing::warn!(state = %state, "Simulated connection attempt failed");
                Ok(state)
            }
            None => {
                tracing::debug!("Connect attempt superseded by disconnect");
                Ok(ConnectionState::Disconnected)
            }
        }
    }

    /// Disconnect from any state.
    ///
    /// Stops all periodic activity, zeroes the connection pool and cancels a
    /// pending [`connect`](ServerSimulator::connect). Once this returns no
    /// periodic task will touch the server again.
    #[tracing::instrument(skip(self), fields(server_id = %self.id()))]
    pub async fn disconnect(&self) {
        for handle in self.halt() {
            // A cancelled JoinError is the expected outcome here.
            let _ = handle.await;
        }

        tracing::info!("Simulated server disconnected");
    }

    /// Moves to `disconnected` and aborts the periodic tasks without waiting
    /// for them to wind down.
    pub(crate) fn halt(&self) -> Vec<JoinHandle<()>> {
        self.inner.transition(|state, now| {
            state.disconnect(now);
            ((), true)
        });

        let handles = self.inner.lock_tasks().take();
        for handle in &handles {
            handle.abort();
        }
        handles
    }

    /// Dry-run connectivity check.
    ///
    /// Logs the attempt and its outcome but never changes the lifecycle
    /// state.
    #[tracing::instrument(skip(self), fields(server_id = %self.id()))]
    pub async fn test_connection(&self) -> bool {
        let delay = self.inner.transition(|state, now| {
            state.begin_test(now);
            (state.test_delay(), true)
        });

        tokio::time::sleep(delay).await;

        let success = self.inner.transition(|state, now| (state.finish_test(now), true));
        tracing::info!(success, "Connection test finished");
        success
    }

    /// The stored configuration stamped with the export time and format version
    pub fn export_config(&self) -> ExportedConfig {
        ExportedConfig::new(self.inner.config.clone(), self.inner.clock.now())
    }
}

impl std::fmt::Debug for ServerSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSimulator")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

impl SimulatorInner {
    pub(crate) fn id(&self) -> &str {
        &self.config.id
    }

    pub(crate) fn profile(&self) -> SimulationProfile {
        self.lock_state().profile().clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_tasks(&self) -> MutexGuard<'_, ActivityTasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the state under the lock.
    ///
    /// `f` returns its result plus whether it changed anything observable; on
    /// a change the observer gets a snapshot once the lock is released.
    fn transition<R>(&self, f: impl FnOnce(&mut SimState, DateTime<Utc>) -> (R, bool)) -> R {
        let now = self.clock.now();
        let (result, snapshot) = {
            let mut state = self.lock_state();
            let (result, changed) = f(&mut state, now);
            (result, changed.then(|| state.status().clone()))
        };

        if let (Some(snapshot), Some(observer)) = (snapshot, &self.observer) {
            observer.status_changed(snapshot);
        }
        result
    }

    /// Starts the periodic tasks for the connection established under `epoch`.
    fn start_activity(self: &Arc<Self>, epoch: u64) {
        let mut tasks = self.lock_tasks();

        // A disconnect may have slipped in since the connect settled.
        {
            let state = self.lock_state();
            if !state.is_connected() || state.epoch() != epoch {
                return;
            }
        }

        let previous = tasks.replace(monitor::spawn_activity(self));
        for handle in previous {
            handle.abort();
        }
    }

    pub(crate) fn run_health_check(&self) {
        tracing::trace!(server_id = %self.id(), "Health check tick");
        self.transition(|state, now| ((), state.health_check(now)));
    }

    pub(crate) fn run_metrics_tick(&self) {
        tracing::trace!(server_id = %self.id(), "Metrics tick");
        self.transition(|state, now| ((), state.metrics_tick(now)));
    }

    pub(crate) fn run_pool_drift(&self) {
        tracing::trace!(server_id = %self.id(), "Pool drift tick");
        self.transition(|state, _| ((), state.pool_drift()));
    }

    pub(crate) fn run_activity_tick(&self) {
        self.transition(|state, now| ((), state.activity_tick(now)));
    }

    pub(crate) fn activity_delay(&self) -> Duration {
        self.lock_state().activity_delay()
    }
}

impl Drop for SimulatorInner {
    fn drop(&mut self) {
        self.tasks
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
    }
}
