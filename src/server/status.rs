use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use uuid::Uuid;

/// Maximum number of log entries kept per server.
pub const MAX_LOG_ENTRIES: usize = 100;

/// Lifecycle state of a simulated server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Not connected; the initial state
    Disconnected,
    /// A connect attempt is in flight
    Connecting,
    /// Connected, periodic activity running
    Connected,
    /// The last connect attempt failed
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        };
        f.write_str(label)
    }
}

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

/// One line of a server's activity log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl LogEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        level: LogLevel,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            level,
            message: message.into(),
            details,
        }
    }
}

/// Newest-first log buffer capped at [`MAX_LOG_ENTRIES`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
}

impl LogBuffer {
    /// Adds an entry at the front, evicting the oldest entry on overflow.
    pub(crate) fn push(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(MAX_LOG_ENTRIES);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Entries from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Synthetic traffic metrics of a server
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMetrics {
    pub requests_per_second: f64,
    /// Average request latency in milliseconds
    pub average_latency: f64,
    /// `total_errors / total_requests`, nudged by health probes; always in `[0, 1]`
    pub error_rate: f64,
    pub total_requests: u64,
    pub total_errors: u64,
    /// Milliseconds since the connection was established
    pub uptime: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_request_time: Option<DateTime<Utc>>,
}

/// Connection pool counters; `total` is always `active + idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionPoolStats {
    active: u32,
    idle: u32,
    total: u32,
}

impl ConnectionPoolStats {
    pub fn new(active: u32, idle: u32) -> Self {
        Self {
            active,
            idle,
            total: active + idle,
        }
    }

    pub fn active(&self) -> u32 {
        self.active
    }

    pub fn idle(&self) -> u32 {
        self.idle
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}

/// Snapshot of one simulated server's state.
///
/// Values of this type handed out by a simulator are copies; changing them
/// has no effect on the simulator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub id: String,
    pub status: ConnectionState,
    pub metrics: ServerMetrics,
    pub logs: LogBuffer,
    pub connection_pool: ConnectionPoolStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_health_check: Option<DateTime<Utc>>,
}

impl ServerStatus {
    /// Fresh, disconnected status for the given server id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ConnectionState::Disconnected,
            metrics: ServerMetrics::default(),
            logs: LogBuffer::default(),
            connection_pool: ConnectionPoolStats::default(),
            connection_time: None,
            last_health_check: None,
        }
    }
}
