use prometheus::{Encoder, IntGauge, Registry, TextEncoder};

use crate::metrics::{
    create_active_users_gauge, create_simulation_running_gauge, MetricsError, MetricsResult,
};
use crate::sink::MetricsSink;

/// Publishes the run gauges through a Prometheus [Registry] owned by this sink.
///
/// The registry is private to the sink rather than the process-wide default one, so several
/// sinks can live side by side (one per test, for example) without name clashes.
#[derive(Clone)]
pub struct PrometheusSink {
    registry: Registry,
    active_users: IntGauge,
    simulation_running: IntGauge,
}

impl PrometheusSink {
    pub fn new() -> MetricsResult<Self> {
        let registry = Registry::new();
        let active_users = create_active_users_gauge(&registry)?;
        let simulation_running = create_simulation_running_gauge(&registry)?;

        Ok(Self {
            registry,
            active_users,
            simulation_running,
        })
    }

    /// Encode all registered metrics in the Prometheus text exposition format.
    pub fn encode_text(&self) -> MetricsResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

impl MetricsSink for PrometheusSink {
    fn set_active_users(&self, active_users: u64) {
        let value = i64::try_from(active_users).unwrap_or(i64::MAX);
        self.active_users.set(value);
    }

    fn set_running(&self, running: bool) {
        self.simulation_running.set(i64::from(running));
    }
}
