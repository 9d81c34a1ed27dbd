//! Periodic activity of a connected simulator.
//!
//! While a server is connected four independent tasks run against it: the
//! health probe, the metrics tick, the synthetic activity generator, and the
//! connection-pool drift. Each task holds only a weak reference to the
//! simulator and exits once the simulator is gone; `disconnect()` aborts them
//! explicitly.

use crate::server::simulator::SimulatorInner;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Handles of the tasks started by one successful connect
#[derive(Default)]
pub(crate) struct ActivityTasks {
    handles: Vec<JoinHandle<()>>,
}

impl ActivityTasks {
    pub(crate) fn is_running(&self) -> bool {
        self.handles.iter().any(|handle| !handle.is_finished())
    }

    pub(crate) fn replace(&mut self, handles: Vec<JoinHandle<()>>) -> Vec<JoinHandle<()>> {
        std::mem::replace(&mut self.handles, handles)
    }

    pub(crate) fn take(&mut self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.handles)
    }

    pub(crate) fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

/// Spawns all periodic tasks for a freshly connected simulator.
pub(crate) fn spawn_activity(inner: &Arc<SimulatorInner>) -> Vec<JoinHandle<()>> {
    let profile = inner.profile();

    vec![
        spawn_periodic(
            inner,
            profile.health_check_interval(),
            "health-check",
            SimulatorInner::run_health_check,
        ),
        spawn_periodic(
            inner,
            profile.metrics_interval(),
            "metrics",
            SimulatorInner::run_metrics_tick,
        ),
        spawn_periodic(
            inner,
            profile.pool_drift_interval(),
            "pool-drift",
            SimulatorInner::run_pool_drift,
        ),
        spawn_activity_simulator(inner),
    ]
}

/// Runs `tick` every `period`, starting one period from now.
fn spawn_periodic(
    inner: &Arc<SimulatorInner>,
    period: Duration,
    task: &'static str,
    tick: fn(&SimulatorInner),
) -> JoinHandle<()> {
    let weak = Arc::downgrade(inner);
    let server_id = inner.id().to_string();

    tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let Some(inner) = weak.upgrade() else {
                tracing::trace!(server_id = %server_id, task, "Simulator dropped, stopping task");
                break;
            };
            tick(&inner);
        }
    })
}

/// Rolls for a synthetic log line after every random delay.
fn spawn_activity_simulator(inner: &Arc<SimulatorInner>) -> JoinHandle<()> {
    let weak: Weak<SimulatorInner> = Arc::downgrade(inner);

    tokio::spawn(async move {
        loop {
            let delay = match weak.upgrade() {
                Some(inner) => inner.activity_delay(),
                None => break,
            };
            time::sleep(delay).await;

            match weak.upgrade() {
                Some(inner) => inner.run_activity_tick(),
                None => break,
            }
        }
    })
}
