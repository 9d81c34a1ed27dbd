use mcp_pool_sim::PoolManager;
use mcp_pool_sim::error::Result;
use mcp_pool_sim::server::{PoolObserver, ServerStatus};
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt};

/// Prints one line per server change
struct ConsoleObserver;

impl PoolObserver for ConsoleObserver {
    fn server_changed(&self, status: &ServerStatus) {
        if let Some(entry) = status.logs.latest() {
            let state = status.status.to_string();
            println!("[{}] {:<12} {:?}: {}", status.id, state, entry.level, entry.message);
        }
    }

    fn statuses_changed(&self, _statuses: Vec<ServerStatus>) {}
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG=mcp_pool_sim=debug shows the simulator's own spans
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    tracing::info!("Starting pool_demo");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/pool.yaml".to_string());
    let pool = PoolManager::from_config_file(&config_path)?;
    pool.set_observer(ConsoleObserver);

    println!("Connecting {} servers...", pool.len());
    for (id, result) in pool.connect_all().await {
        match result {
            Ok(state) => println!("{} settled as {}", id, state),
            Err(e) => println!("{} was not connected: {}", id, e),
        }
    }

    tokio::time::sleep(Duration::from_secs(10)).await;

    println!("\n=== Summary ===");
    let summary = pool.summary();
    println!(
        "{} connected, {} errored, {:.1} req/s, {:.1}ms average latency",
        summary.connected, summary.errored, summary.requests_per_second, summary.average_latency
    );
    for status in pool.get_all_statuses() {
        let connections = status.connection_pool;
        println!(
            "- {}: {} ({} active / {} idle, {} requests, error rate {:.2})",
            status.id,
            status.status,
            connections.active(),
            connections.idle(),
            status.metrics.total_requests,
            status.metrics.error_rate
        );
    }

    // Dry run against a server without touching its state
    if let Some(id) = pool.server_ids().first() {
        let ok = pool.test_connection(id).await?;
        println!("\nConnection test for {}: {}", id, if ok { "passed" } else { "failed" });
    }

    pool.clear_observer();
    println!("\n=== Export ===");
    println!("{}", pool.export_all_configurations()?);

    pool.disconnect_all().await;
    tracing::info!("pool_demo finished");
    Ok(())
}
