mod metrics;
mod sink;

pub use metrics::{MetricsError, MetricsResult, ACTIVE_USERS_METRIC, SIMULATION_RUNNING_METRIC};
pub use sink::{GaugeUpdate, InMemorySink, MetricsSink, NoopSink, PrometheusSink};
