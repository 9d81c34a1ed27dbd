use crate::server::status::ServerStatus;

/// Receives a snapshot of a simulator's status after every change.
///
/// Snapshots are owned copies; they are delivered after the simulator has
/// released its internal lock, so an observer may freely call back into the
/// simulator or the pool.
pub trait StatusObserver: Send + Sync {
    fn status_changed(&self, status: ServerStatus);
}

impl<F> StatusObserver for F
where
    F: Fn(ServerStatus) + Send + Sync,
{
    fn status_changed(&self, status: ServerStatus) {
        self(status)
    }
}

/// Receives pool-wide updates.
///
/// For a change inside one simulator, `server_changed` is called first with
/// that server's snapshot, followed by `statuses_changed` with the snapshots
/// of every server in the pool. Membership changes (add, remove, import) only
/// trigger `statuses_changed`.
pub trait PoolObserver: Send + Sync {
    fn server_changed(&self, _status: &ServerStatus) {}

    fn statuses_changed(&self, statuses: Vec<ServerStatus>);
}

impl<F> PoolObserver for F
where
    F: Fn(Vec<ServerStatus>) + Send + Sync,
{
    fn statuses_changed(&self, statuses: Vec<ServerStatus>) {
        self(statuses)
    }
}
