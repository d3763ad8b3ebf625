mod in_memory_sink;
mod prometheus_sink;

pub use in_memory_sink::InMemorySink;
pub use prometheus_sink::PrometheusSink;

/// Receiver of point-in-time gauge updates for the supervised run.
///
/// Implementations are shared between the request handlers and the background run tasks, so all
/// methods take `&self` and must be cheap. They must never block on I/O.
pub trait MetricsSink: Send + Sync {
    fn set_active_users(&self, active_users: u64);

    fn set_running(&self, running: bool);
}

/// A single update delivered to a [MetricsSink], as recorded by [InMemorySink].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeUpdate {
    ActiveUsers(u64),
    Running(bool),
}

/// Discards every update. Useful when metrics exposition is not wanted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn set_active_users(&self, _active_users: u64) {}

    fn set_running(&self, _running: bool) {}
}
