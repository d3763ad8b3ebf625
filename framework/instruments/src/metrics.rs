use prometheus::{IntGauge, Opts, Registry};
use thiserror::Error;

/// Gauge holding the last parsed number of active users for the current simulation.
pub const ACTIVE_USERS_METRIC: &str = "gatling_active_users";

/// Gauge set to `1` while a simulation is running and `0` otherwise.
pub const SIMULATION_RUNNING_METRIC: &str = "gatling_simulation_running";

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),

    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

pub type MetricsResult<T> = Result<T, MetricsError>;

pub(crate) fn create_active_users_gauge(registry: &Registry) -> MetricsResult<IntGauge> {
    register_gauge(
        registry,
        ACTIVE_USERS_METRIC,
        "Number of active users in the current simulation",
    )
}

pub(crate) fn create_simulation_running_gauge(registry: &Registry) -> MetricsResult<IntGauge> {
    register_gauge(
        registry,
        SIMULATION_RUNNING_METRIC,
        "Whether a simulation is currently running (1) or not (0)",
    )
}

fn register_gauge(registry: &Registry, name: &str, help: &str) -> MetricsResult<IntGauge> {
    let gauge = IntGauge::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}
