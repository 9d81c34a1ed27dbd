use crate::error::{Error, Result};
use rand::Rng;
use rand::distributions::uniform::SampleUniform;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Half-open sampling range `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span<T> {
    pub min: T,
    pub max: T,
}

impl<T> Span<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: SampleUniform + PartialOrd + Copy> Span<T> {
    /// Draws a uniform value from the range.
    ///
    /// The range must be non-empty, which [`SimulationProfile::validate`]
    /// guarantees for every span of a validated profile.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        rng.gen_range(self.min..self.max)
    }

    fn is_empty(&self) -> bool {
        self.min >= self.max
    }
}

impl Span<u64> {
    /// Draws a duration in milliseconds from the range.
    pub fn sample_ms<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(self.sample(rng))
    }
}

/// Timing and probability settings of a simulated server.
///
/// The defaults reproduce the behaviour of the dashboard simulator: a one to
/// three second connect with a 10% failure chance, a metrics tick every
/// second, a health probe every thirty seconds, and so on. Tests usually
/// override the probabilities to 0 or 1 to pin down a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationProfile {
    /// Latency of a `connect()` attempt.
    pub connect_delay_ms: Span<u64>,
    /// Probability that a connect attempt ends in `error`.
    pub connect_failure_rate: f64,

    /// Latency of a `test_connection()` dry run.
    pub test_delay_ms: Span<u64>,
    /// Probability that a dry run succeeds.
    pub test_success_rate: f64,

    pub health_check_interval_ms: u64,
    pub health_latency_ms: Span<u64>,
    pub health_failure_rate: f64,
    /// Amount added to the error rate by a failed health probe.
    pub health_failure_penalty: f64,
    /// Amount removed from the error rate by a passing health probe.
    pub health_recovery: f64,

    pub metrics_interval_ms: u64,
    pub base_requests_per_second: Span<f64>,
    pub burst_rate: f64,
    pub burst_multiplier: f64,
    pub request_latency_ms: Span<f64>,
    pub request_error_rate: f64,

    /// Delay between two synthetic activity rolls.
    pub activity_interval_ms: Span<u64>,
    /// Probability that an activity roll appends a log line.
    pub activity_log_rate: f64,

    pub pool_drift_interval_ms: u64,
    pub initial_active_connections: Span<u32>,
    pub initial_idle_connections: Span<u32>,
    pub max_active_connections: u32,
    pub max_idle_connections: u32,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            connect_delay_ms: Span::new(1000, 3000),
            connect_failure_rate: 0.10,
            test_delay_ms: Span::new(500, 1500),
            test_success_rate: 0.80,
            health_check_interval_ms: 30_000,
            health_latency_ms: Span::new(20, 120),
            health_failure_rate: 0.05,
            health_failure_penalty: 0.10,
            health_recovery: 0.01,
            metrics_interval_ms: 1000,
            base_requests_per_second: Span::new(2.0, 12.0),
            burst_rate: 0.10,
            burst_multiplier: 3.0,
            request_latency_ms: Span::new(30.0, 80.0),
            request_error_rate: 0.02,
            activity_interval_ms: Span::new(2000, 5000),
            activity_log_rate: 0.30,
            pool_drift_interval_ms: 5000,
            initial_active_connections: Span::new(1, 6),
            initial_idle_connections: Span::new(1, 4),
            max_active_connections: 10,
            max_idle_connections: 5,
        }
    }
}

impl SimulationProfile {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_interval_ms)
    }

    pub fn pool_drift_interval(&self) -> Duration {
        Duration::from_millis(self.pool_drift_interval_ms)
    }

    /// Checks that every probability is in `[0, 1]`, every range is non-empty
    /// and every interval is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("connectFailureRate", self.connect_failure_rate),
            ("testSuccessRate", self.test_success_rate),
            ("healthFailureRate", self.health_failure_rate),
            ("healthFailurePenalty", self.health_failure_penalty),
            ("healthRecovery", self.health_recovery),
            ("burstRate", self.burst_rate),
            ("requestErrorRate", self.request_error_rate),
            ("activityLogRate", self.activity_log_rate),
        ];
        for (name, rate) in rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(Error::ConfigInvalid(format!(
                    "{} must be within [0, 1], got {}",
                    name, rate
                )));
            }
        }

        let intervals = [
            ("healthCheckIntervalMs", self.health_check_interval_ms),
            ("metricsIntervalMs", self.metrics_interval_ms),
            ("poolDriftIntervalMs", self.pool_drift_interval_ms),
        ];
        for (name, interval) in intervals {
            if interval == 0 {
                return Err(Error::ConfigInvalid(format!("{} must be greater than 0", name)));
            }
        }

        let empty = [
            ("connectDelayMs", self.connect_delay_ms.is_empty()),
            ("testDelayMs", self.test_delay_ms.is_empty()),
            ("healthLatencyMs", self.health_latency_ms.is_empty()),
            ("baseRequestsPerSecond", self.base_requests_per_second.is_empty()),
            ("requestLatencyMs", self.request_latency_ms.is_empty()),
            ("activityIntervalMs", self.activity_interval_ms.is_empty()),
            ("initialActiveConnections", self.initial_active_connections.is_empty()),
            ("initialIdleConnections", self.initial_idle_connections.is_empty()),
        ];
        for (name, is_empty) in empty {
            if is_empty {
                return Err(Error::ConfigInvalid(format!(
                    "{} must describe a non-empty range (min < max)",
                    name
                )));
            }
        }

        if self.activity_interval_ms.min == 0 {
            return Err(Error::ConfigInvalid(
                "activityIntervalMs.min must be greater than 0".to_string(),
            ));
        }

        if !(self.burst_multiplier.is_finite() && self.burst_multiplier >= 1.0) {
            return Err(Error::ConfigInvalid(format!(
                "burstMultiplier must be at least 1, got {}",
                self.burst_multiplier
            )));
        }

        Ok(())
    }
}
