/// Simulated server module for the MCP pool simulator.
///
/// This module holds the per-server state machine and everything it needs:
/// the status snapshot types, the state transitions, the periodic activity
/// tasks, the clock abstraction and the observer traits.
/// Public async operations are instrumented with `tracing` spans.
///
/// # Components
///
/// * `status` - Snapshot types handed to observers and callers
/// * `lifecycle` - State transitions of one simulated server
/// * `monitor` - Periodic health, metrics, activity and pool-drift tasks
/// * `simulator` - The `ServerSimulator` handle tying it all together
///
/// # Examples
///
/// Observing a simulator:
///
/// ```no_run
/// use mcp_pool_sim::config::ServerConfig;
/// use mcp_pool_sim::server::{ServerSimulator, ServerStatus, SimulatorOptions};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> mcp_pool_sim::Result<()> {
/// let config = ServerConfig::new("docs", "Document Store", "ws://localhost:8080/mcp");
/// let observer = Arc::new(|status: ServerStatus| {
///     println!("{} is {} ({} requests)", status.id, status.status, status.metrics.total_requests);
/// });
///
/// let server = ServerSimulator::with_observer(config, SimulatorOptions::default(), observer)?;
/// let _ = server.connect().await;
/// # Ok(())
/// # }
/// ```
pub mod clock;
mod lifecycle;
mod monitor;
pub mod observer;
mod simulator;
pub mod status;

pub use clock::{Clock, RuntimeClock};
pub use observer::{PoolObserver, StatusObserver};
pub use simulator::{ServerSimulator, SimulatorOptions};
pub use status::{
    ConnectionPoolStats, ConnectionState, LogBuffer, LogEntry, LogLevel, MAX_LOG_ENTRIES,
    ServerMetrics, ServerStatus,
};
