//! State transitions of a simulated server.
//!
//! `SimState` owns a server's [`ServerStatus`] together with its random
//! generator. Every mutation goes through one of the methods below; the
//! simulator decides when to call them and takes care of locking, timers and
//! notification. Nothing here touches the clock or the runtime, so the
//! transitions can be driven directly with a seeded generator and chosen
//! timestamps.

use crate::config::{ServerConfig, SimulationProfile};
use crate::error::{Error, Result};
use crate::server::status::{
    ConnectionPoolStats, ConnectionState, LogEntry, LogLevel, ServerStatus,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::{Value, json};
use std::time::Duration;

/// Canned messages emitted by the activity simulator.
const ACTIVITY_MESSAGES: [(LogLevel, &str); 7] = [
    (LogLevel::Info, "Processing document ingestion request"),
    (LogLevel::Debug, "Vector similarity search completed"),
    (LogLevel::Info, "Embedding generated for incoming query"),
    (LogLevel::Debug, "Cache hit for frequent query"),
    (LogLevel::Info, "Context retrieved for chat completion"),
    (LogLevel::Debug, "Chunk index refreshed"),
    (LogLevel::Info, "Tool invocation forwarded to server"),
];

/// Mutable state of one simulated server
pub(crate) struct SimState {
    status: ServerStatus,
    name: String,
    endpoint: String,
    profile: SimulationProfile,
    rng: StdRng,
    /// Bumped by every disconnect; an in-flight connect that started under an
    /// older epoch is abandoned.
    epoch: u64,
}

impl SimState {
    pub(crate) fn new(config: &ServerConfig, profile: SimulationProfile, rng: StdRng) -> Self {
        Self {
            status: ServerStatus::new(config.id.clone()),
            name: config.name.clone(),
            endpoint: config.endpoint.clone(),
            profile,
            rng,
            epoch: 0,
        }
    }

    pub(crate) fn status(&self) -> &ServerStatus {
        &self.status
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.status.status
    }

    pub(crate) fn profile(&self) -> &SimulationProfile {
        &self.profile
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.status.status == ConnectionState::Connected
    }

    fn log(
        &mut self,
        now: DateTime<Utc>,
        level: LogLevel,
        message: impl Into<String>,
        details: Option<Value>,
    ) {
        self.status.logs.push(LogEntry::new(now, level, message, details));
    }

    pub(crate) fn clear_logs(&mut self) {
        self.status.logs.clear();
    }

    /// Enters `connecting` and returns the epoch the attempt belongs to.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyConnected`] if the server is connecting or connected.
    pub(crate) fn begin_connect(&mut self, now: DateTime<Utc>) -> Result<u64> {
        if matches!(
            self.status.status,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            return Err(Error::AlreadyConnected(self.status.id.clone()));
        }

        self.status.status = ConnectionState::Connecting;
        let message = format!("Attempting to connect to {}", self.name);
        let details = json!({ "endpoint": self.endpoint });
        self.log(now, LogLevel::Info, message, Some(details));
        Ok(self.epoch)
    }

    pub(crate) fn connect_delay(&mut self) -> Duration {
        self.profile.connect_delay_ms.sample_ms(&mut self.rng)
    }

    /// Settles a connect attempt.
    ///
    /// Returns `None` without touching anything when the attempt was
    /// superseded by a disconnect.
    pub(crate) fn finish_connect(
        &mut self,
        epoch: u64,
        now: DateTime<Utc>,
    ) -> Option<ConnectionState> {
        if epoch != self.epoch || self.status.status != ConnectionState::Connecting {
            return None;
        }

        if self.rng.gen_bool(self.profile.connect_failure_rate) {
            self.status.status = ConnectionState::Error;
            let message = format!("Failed to connect to {}", self.name);
            let details = json!({ "endpoint": self.endpoint, "reason": "Connection timeout" });
            self.log(now, LogLevel::Error, message, Some(details));
            return Some(ConnectionState::Error);
        }

        let active = self.profile.initial_active_connections.sample(&mut self.rng);
        let idle = self.profile.initial_idle_connections.sample(&mut self.rng);

        self.status.status = ConnectionState::Connected;
        self.status.connection_time = Some(now);
        self.status.metrics.uptime = 0;
        self.status.connection_pool = ConnectionPoolStats::new(active, idle);

        let message = format!("Successfully connected to {}", self.name);
        self.log(now, LogLevel::Info, message, None);
        let details = json!({ "active": active, "idle": idle });
        self.log(now, LogLevel::Debug, "Connection pool initialized", Some(details));
        Some(ConnectionState::Connected)
    }

    /// Returns to `disconnected` from any state and cancels pending connects.
    pub(crate) fn disconnect(&mut self, now: DateTime<Utc>) {
        self.epoch += 1;
        let message = format!("Disconnected from {}", self.name);
        self.log(now, LogLevel::Info, message, None);

        self.status.status = ConnectionState::Disconnected;
        self.status.connection_time = None;
        self.status.connection_pool = ConnectionPoolStats::default();
        self.status.metrics.requests_per_second = 0.0;
        self.status.metrics.uptime = 0;
    }

    pub(crate) fn begin_test(&mut self, now: DateTime<Utc>) {
        let message = format!("Testing connection to {}", self.name);
        let details = json!({ "endpoint": self.endpoint });
        self.log(now, LogLevel::Info, message, Some(details));
    }

    pub(crate) fn test_delay(&mut self) -> Duration {
        self.profile.test_delay_ms.sample_ms(&mut self.rng)
    }

    pub(crate) fn finish_test(&mut self, now: DateTime<Utc>) -> bool {
        let success = self.rng.gen_bool(self.profile.test_success_rate);
        if success {
            self.log(now, LogLevel::Info, "Connection test successful", None);
        } else {
            self.log(now, LogLevel::Error, "Connection test failed", None);
        }
        success
    }

    /// Periodic health probe. Returns `false` when not connected.
    pub(crate) fn health_check(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_connected() {
            return false;
        }

        let latency = self.profile.health_latency_ms.sample(&mut self.rng);
        self.status.last_health_check = Some(now);
        let details = json!({ "latency": latency });

        let metrics = &mut self.status.metrics;
        if self.rng.gen_bool(self.profile.health_failure_rate) {
            metrics.error_rate =
                (metrics.error_rate + self.profile.health_failure_penalty).min(1.0);
            let message = format!("Health check failed: slow response ({}ms)", latency);
            self.log(now, LogLevel::Warn, message, Some(details));
        } else {
            metrics.error_rate = (metrics.error_rate - self.profile.health_recovery).max(0.0);
            let message = format!("Health check passed ({}ms)", latency);
            self.log(now, LogLevel::Debug, message, Some(details));
        }
        true
    }

    /// Periodic metrics update. Returns `false` when not connected.
    pub(crate) fn metrics_tick(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_connected() {
            return false;
        }

        let mut rps = self.profile.base_requests_per_second.sample(&mut self.rng);
        if self.rng.gen_bool(self.profile.burst_rate) {
            rps *= self.profile.burst_multiplier;
        }
        let latency = self.profile.request_latency_ms.sample(&mut self.rng);
        let request_failed = self.rng.gen_bool(self.profile.request_error_rate);

        let metrics = &mut self.status.metrics;
        metrics.requests_per_second = rps;
        metrics.average_latency = latency;
        metrics.total_requests += rps.floor() as u64;
        metrics.last_request_time = Some(now);

        if request_failed {
            metrics.total_errors += 1;
        }

        metrics.error_rate = if metrics.total_requests > 0 {
            (metrics.total_errors as f64 / metrics.total_requests as f64).min(1.0)
        } else {
            0.0
        };
        metrics.uptime = self
            .status
            .connection_time
            .map(|since| (now - since).num_milliseconds().max(0) as u64)
            .unwrap_or(0);

        if request_failed {
            let details = json!({ "latency": latency });
            let message = "Request failed: upstream returned an error";
            self.log(now, LogLevel::Error, message, Some(details));
        }
        true
    }

    pub(crate) fn activity_delay(&mut self) -> Duration {
        self.profile.activity_interval_ms.sample_ms(&mut self.rng)
    }

    /// Synthetic activity roll. Returns whether a log line was appended.
    pub(crate) fn activity_tick(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_connected() || !self.rng.gen_bool(self.profile.activity_log_rate) {
            return false;
        }

        match ACTIVITY_MESSAGES.choose(&mut self.rng) {
            Some(&(level, message)) => {
                self.log(now, level, message, None);
                true
            }
            None => false,
        }
    }

    /// Random walk of the connection pool. Returns `false` when not connected.
    pub(crate) fn pool_drift(&mut self) -> bool {
        if !self.is_connected() {
            return false;
        }

        let pool = self.status.connection_pool;
        let active = drift(&mut self.rng, pool.active(), self.profile.max_active_connections);
        let idle = drift(&mut self.rng, pool.idle(), self.profile.max_idle_connections);
        self.status.connection_pool = ConnectionPoolStats::new(active, idle);
        true
    }
}

fn drift(rng: &mut StdRng, value: u32, max: u32) -> u32 {
    let delta: i64 = rng.gen_range(-1..=1);
    (value as i64 + delta).clamp(0, max as i64) as u32
}
