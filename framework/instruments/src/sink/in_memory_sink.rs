use parking_lot::Mutex;

use crate::sink::{GaugeUpdate, MetricsSink};

/// Keeps every update in memory, in the order it was received.
#[derive(Debug, Default)]
pub struct InMemorySink {
    updates: Mutex<Vec<GaugeUpdate>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<GaugeUpdate> {
        self.updates.lock().clone()
    }

    /// The most recent active user count pushed to this sink, if any.
    pub fn last_active_users(&self) -> Option<u64> {
        self.updates.lock().iter().rev().find_map(|update| match update {
            GaugeUpdate::ActiveUsers(value) => Some(*value),
            GaugeUpdate::Running(_) => None,
        })
    }

    /// The most recent running flag pushed to this sink, if any.
    pub fn last_running(&self) -> Option<bool> {
        self.updates.lock().iter().rev().find_map(|update| match update {
            GaugeUpdate::Running(running) => Some(*running),
            GaugeUpdate::ActiveUsers(_) => None,
        })
    }
}

impl MetricsSink for InMemorySink {
    fn set_active_users(&self, active_users: u64) {
        self.updates.lock().push(GaugeUpdate::ActiveUsers(active_users));
    }

    fn set_running(&self, running: bool) {
        self.updates.lock().push(GaugeUpdate::Running(running));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn records_updates_in_order() {
        let sink = InMemorySink::new();
        sink.set_running(true);
        sink.set_active_users(0);
        sink.set_active_users(12);
        sink.set_running(false);

        assert_eq!(
            sink.updates(),
            vec![
                GaugeUpdate::Running(true),
                GaugeUpdate::ActiveUsers(0),
                GaugeUpdate::ActiveUsers(12),
                GaugeUpdate::Running(false),
            ]
        );
        assert_eq!(sink.last_active_users(), Some(12));
        assert_eq!(sink.last_running(), Some(false));
    }

    #[test]
    fn empty_sink_has_no_last_values() {
        let sink = InMemorySink::new();
        assert_eq!(sink.last_active_users(), None);
        assert_eq!(sink.last_running(), None);
    }
}
