use std::sync::Arc;

use chrono::Utc;
use gatling_shim_core::prelude::StartRejected;
use gatling_shim_instruments::MetricsSink;
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::RunnerConfig;
use crate::report_locator::ReportLocator;
use crate::state::RunState;
use crate::supervisor::{
    OutputStream, ProcessCommand, ProcessOutcome, ProcessSupervisor, SupervisedRun,
};

/// Log target used for the supervised process's own output.
pub const PROCESS_OUTPUT_LOG_TARGET: &str = "gatling";

/// Owns the state of the single run and drives it from start to finish.
///
/// Cheap to clone; clones share the same run slot. A run is started with
/// [RunManager::request_start] and then proceeds in the background. Callers learn about its
/// progress and completion only through [RunManager::snapshot].
#[derive(Clone)]
pub struct RunManager {
    inner: Arc<Inner>,
}

struct Inner {
    state: RwLock<RunState>,
    config: RunnerConfig,
    supervisor: ProcessSupervisor,
    locator: ReportLocator,
    sink: Arc<dyn MetricsSink>,
}

impl RunManager {
    pub fn new(config: RunnerConfig, sink: Arc<dyn MetricsSink>) -> Self {
        let supervisor = ProcessSupervisor::new(config.read_buffer_size());
        let locator = ReportLocator::new(config.reports_dir());

        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(RunState::default()),
                config,
                supervisor,
                locator,
                sink,
            }),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.inner.config
    }

    /// Start a run of `simulation_class` in the background and return straight away.
    ///
    /// The class is trimmed, and an empty class is rejected before the state is touched. The
    /// running check and the transition to running happen under one write lock, so of several
    /// concurrent requests exactly one wins.
    ///
    /// The run is spawned on the current Tokio runtime. Called outside one, the request is
    /// rejected with [StartRejected::NoRuntime] and the state is left as it was.
    pub fn request_start(&self, simulation_class: &str) -> Result<(), StartRejected> {
        let simulation_class = simulation_class.trim();
        if simulation_class.is_empty() {
            return Err(StartRejected::InvalidInput);
        }

        let runtime = Handle::try_current().map_err(|e| {
            log::error!("Cannot start simulation {simulation_class}: {e}");
            StartRejected::NoRuntime
        })?;

        {
            let mut state = self.inner.state.write();
            if state.running {
                return Err(StartRejected::AlreadyRunning {
                    simulation_class: state.simulation_class.clone().unwrap_or_default(),
                });
            }

            state.running = true;
            state.simulation_class = Some(simulation_class.to_string());
            state.start_time = Some(Utc::now());
            state.active_users = 0;
        }

        log::info!("Starting simulation: {simulation_class}");
        self.inner.sink.set_running(true);
        self.inner.sink.set_active_users(0);

        let command = self.inner.config.command_for(simulation_class);
        runtime.spawn(self.clone().drive(command));

        Ok(())
    }

    /// A copy of the current run state.
    pub fn snapshot(&self) -> RunState {
        self.inner.state.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.read().running
    }

    async fn drive(self, command: ProcessCommand) {
        let run = self.inner.supervisor.run(&command);
        self.follow(run).await;
    }

    /// Read the run's output until the process exits, then finalize the state.
    async fn follow(self, run: SupervisedRun) {
        let SupervisedRun { output, completion } = run;

        let reader = tokio::spawn(self.clone().read_output(output));
        let outcome = completion.wait().await;

        self.drain_reader(reader).await;
        self.on_completion(outcome);
    }

    async fn read_output(self, mut output: OutputStream) {
        while let Some(chunk) = output.recv().await {
            match chunk {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    log::info!(target: PROCESS_OUTPUT_LOG_TARGET, "{}", text.trim_end());
                    self.on_output_chunk(&text);
                }
                Err(e) => {
                    log::error!("Stopped reading simulation output: {e}");
                    break;
                }
            }
        }
    }

    /// Give the reader a bounded amount of time to apply output still buffered after the process
    /// exited. A reader still running after that is aborted, and awaited, so that it cannot touch
    /// the state once the run has been finalized. Output not read by then is lost.
    async fn drain_reader(&self, mut reader: JoinHandle<()>) {
        let drain_timeout = self.inner.config.drain_timeout();
        match tokio::time::timeout(drain_timeout, &mut reader).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("Simulation output reader failed: {e}"),
            Err(_) => {
                log::warn!(
                    "Simulation output still open {drain_timeout:?} after the process exited, discarding the rest"
                );
                reader.abort();
                let _ = reader.await;
            }
        }
    }

    fn on_output_chunk(&self, chunk: &str) {
        let Some(active_users) = self.inner.config.output_parser().extract(chunk) else {
            return;
        };

        self.inner.state.write().active_users = active_users;
        self.inner.sink.set_active_users(active_users);
        log::debug!("Active users: {active_users}");
    }

    fn on_completion(&self, outcome: ProcessOutcome) {
        match &outcome {
            Ok(()) => log::info!("Simulation completed"),
            Err(e) => log::error!("Simulation failed: {e}"),
        }

        // Looked up before taking the lock so readers never wait on the filesystem. The state
        // still moves from running to finished in a single write.
        let report_path = self.inner.locator.find_latest();

        {
            let mut state = self.inner.state.write();
            state.running = false;
            state.active_users = 0;
            state.report_path = report_path.clone();
        }

        self.inner.sink.set_running(false);
        self.inner.sink.set_active_users(0);

        match report_path {
            Some(path) => log::info!("Report available at: {}", path.display()),
            None => log::info!(
                "No report found in '{}'",
                self.inner.locator.reports_root().display()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;

    use bytes::Bytes;
    use gatling_shim_instruments::{GaugeUpdate, InMemorySink};
    use tokio::sync::{mpsc, oneshot};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::output_parser::OutputParser;
    use crate::report_locator::REPORT_INDEX_FILE;
    use crate::supervisor::{Completion, SupervisorError};

    fn manager_in(project: &TempDir) -> (RunManager, Arc<InMemorySink>) {
        let sink = Arc::new(InMemorySink::new());
        let manager = RunManager::new(RunnerConfig::new(project.path()), sink.clone());
        (manager, sink)
    }

    fn mark_running(manager: &RunManager) {
        let mut state = manager.inner.state.write();
        state.running = true;
        state.simulation_class = Some("SimA".to_string());
    }

    #[test]
    fn unmatched_chunk_keeps_last_count() {
        let project = TempDir::new().unwrap();
        let (manager, sink) = manager_in(&project);
        mark_running(&manager);

        manager.on_output_chunk("waiting: 0 / active: 9 / done: 0");
        manager.on_output_chunk("no numbers here");

        assert_eq!(9, manager.snapshot().active_users);
        assert_eq!(vec![GaugeUpdate::ActiveUsers(9)], sink.updates());
    }

    #[test]
    fn counts_apply_in_stream_order() {
        let project = TempDir::new().unwrap();
        let (manager, sink) = manager_in(&project);
        mark_running(&manager);

        for chunk in ["active: 1", "active: 5", "3 active"] {
            manager.on_output_chunk(chunk);
        }

        assert_eq!(3, manager.snapshot().active_users);
        assert_eq!(Some(3), sink.last_active_users());
    }

    #[test]
    fn completion_resets_and_records_latest_report() {
        let project = TempDir::new().unwrap();
        let report_dir = project.path().join("target/gatling/sima-20250301103000");
        fs::create_dir_all(&report_dir).unwrap();
        let (manager, sink) = manager_in(&project);
        mark_running(&manager);
        manager.on_output_chunk("active: 9");

        manager.on_completion(Ok(()));

        let state = manager.snapshot();
        assert!(!state.running);
        assert_eq!(0, state.active_users);
        assert_eq!(Some(report_dir.join(REPORT_INDEX_FILE)), state.report_path);
        assert_eq!(Some("SimA".to_string()), state.simulation_class);
        assert_eq!(Some(false), sink.last_running());
        assert_eq!(Some(0), sink.last_active_users());
    }

    #[test]
    fn failed_run_finishes_like_a_successful_one() {
        let project = TempDir::new().unwrap();
        let (manager, _sink) = manager_in(&project);
        mark_running(&manager);

        manager.on_completion(Err(SupervisorError::CompletionLost));

        let state = manager.snapshot();
        assert!(!state.running);
        assert_eq!(0, state.active_users);
        assert_eq!(None, state.report_path);
    }

    #[test]
    fn blank_class_is_rejected_without_a_runtime() {
        let project = TempDir::new().unwrap();
        let (manager, sink) = manager_in(&project);

        assert_eq!(Err(StartRejected::InvalidInput), manager.request_start(""));
        assert_eq!(Err(StartRejected::InvalidInput), manager.request_start("  \t"));
        assert_eq!(RunState::default(), manager.snapshot());
        assert!(sink.updates().is_empty());
    }

    #[test]
    fn start_without_a_runtime_is_rejected_and_state_stays_idle() {
        let project = TempDir::new().unwrap();
        let (manager, sink) = manager_in(&project);

        assert_eq!(Err(StartRejected::NoRuntime), manager.request_start("SimA"));
        assert_eq!(RunState::default(), manager.snapshot());
        assert!(sink.updates().is_empty());

        // Still idle, so a later start is not refused as already running.
        assert_eq!(Err(StartRejected::NoRuntime), manager.request_start("SimA"));
    }

    #[tokio::test]
    async fn read_error_stops_output_but_completion_still_finalizes() {
        let project = TempDir::new().unwrap();
        let (manager, sink) = manager_in(&project);
        mark_running(&manager);

        let (output_sender, output) = mpsc::unbounded_channel();
        let (completion_sender, completion) = oneshot::channel();
        output_sender.send(Ok(Bytes::from_static(b"active: 3"))).unwrap();
        output_sender
            .send(Err(io::Error::other("pipe broke")))
            .unwrap();
        output_sender.send(Ok(Bytes::from_static(b"active: 8"))).unwrap();
        completion_sender.send(Ok(())).unwrap();

        manager
            .clone()
            .follow(SupervisedRun {
                output,
                completion: Completion::new(completion),
            })
            .await;

        let state = manager.snapshot();
        assert!(!state.running);
        assert_eq!(0, state.active_users);
        assert_eq!(
            vec![
                GaugeUpdate::ActiveUsers(3),
                GaugeUpdate::Running(false),
                GaugeUpdate::ActiveUsers(0),
            ],
            sink.updates()
        );
    }

    #[test]
    fn custom_output_parser_is_used_for_chunks() {
        let project = TempDir::new().unwrap();
        let parser = OutputParser::with_patterns([r"concurrent=(\d+)"]).unwrap();
        let sink = Arc::new(InMemorySink::new());
        let manager = RunManager::new(
            RunnerConfig::new(project.path()).with_output_parser(parser),
            sink.clone(),
        );
        mark_running(&manager);

        manager.on_output_chunk("active: 9");
        manager.on_output_chunk("users concurrent=42 ramping");

        assert_eq!(42, manager.snapshot().active_users);
        assert_eq!(vec![GaugeUpdate::ActiveUsers(42)], sink.updates());
    }

    #[tokio::test]
    async fn start_is_refused_while_running() {
        let project = TempDir::new().unwrap();
        let (manager, _sink) = manager_in(&project);
        mark_running(&manager);
        let before = manager.snapshot();

        assert_eq!(
            Err(StartRejected::AlreadyRunning {
                simulation_class: "SimA".to_string()
            }),
            manager.request_start("SimB")
        );
        assert_eq!(before, manager.snapshot());
    }
}
