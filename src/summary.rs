//! Aggregate view over every server in a pool.

use crate::server::{ConnectionState, ServerStatus};
use serde::Serialize;

/// Pool-wide totals, suitable for a dashboard header
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSummary {
    pub total_servers: usize,
    pub connected: usize,
    pub connecting: usize,
    pub errored: usize,
    pub disconnected: usize,
    /// Sum of the current request rates of all servers
    pub requests_per_second: f64,
    /// Mean of `averageLatency` over connected servers, 0 when none are connected
    pub average_latency: f64,
    pub total_requests: u64,
    pub total_errors: u64,
    pub active_connections: u32,
    pub idle_connections: u32,
}

impl PoolSummary {
    pub fn from_statuses(statuses: &[ServerStatus]) -> Self {
        let mut summary = Self {
            total_servers: statuses.len(),
            ..Self::default()
        };
        let mut latency_sum = 0.0;

        for status in statuses {
            match status.status {
                ConnectionState::Connected => {
                    summary.connected += 1;
                    latency_sum += status.metrics.average_latency;
                }
                ConnectionState::Connecting => summary.connecting += 1,
                ConnectionState::Error => summary.errored += 1,
                ConnectionState::Disconnected => summary.disconnected += 1,
            }

            summary.requests_per_second += status.metrics.requests_per_second;
            summary.total_requests += status.metrics.total_requests;
            summary.total_errors += status.metrics.total_errors;
            summary.active_connections += status.connection_pool.active();
            summary.idle_connections += status.connection_pool.idle();
        }

        if summary.connected > 0 {
            summary.average_latency = latency_sum / summary.connected as f64;
        }

        summary
    }
}
