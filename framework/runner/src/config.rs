use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::output_parser::OutputParser;
use crate::supervisor::{ProcessCommand, DEFAULT_READ_BUFFER_SIZE};

/// Launcher used to run a simulation, relative to the project directory.
pub const DEFAULT_EXECUTABLE: &str = "./mvnw";

/// Arguments passed before the simulation argument.
pub const DEFAULT_FIXED_ARGS: [&str; 1] = ["gatling:test"];

/// Prepended to the simulation class to form the final argument.
pub const DEFAULT_SIMULATION_ARG_PREFIX: &str = "-Dgatling.simulationClass=";

/// How long to keep reading buffered output after the process has exited.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Where reports are written, relative to the project directory.
pub fn default_reports_dir(project_dir: &Path) -> PathBuf {
    project_dir.join("target").join("gatling")
}

/// Everything the [crate::prelude::RunManager] needs to launch and follow a run.
///
/// Created with [RunnerConfig::new] which fills in the Maven/Gatling defaults, then adjusted with
/// the `with_*` methods.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    project_dir: PathBuf,
    executable: PathBuf,
    fixed_args: Vec<String>,
    simulation_arg_prefix: String,
    reports_dir: PathBuf,
    drain_timeout: Duration,
    read_buffer_size: usize,
    output_parser: OutputParser,
}

impl RunnerConfig {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let reports_dir = default_reports_dir(&project_dir);

        Self {
            project_dir,
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            fixed_args: DEFAULT_FIXED_ARGS.iter().map(|s| s.to_string()).collect(),
            simulation_arg_prefix: DEFAULT_SIMULATION_ARG_PREFIX.to_string(),
            reports_dir,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            output_parser: OutputParser::default(),
        }
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn with_fixed_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fixed_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_simulation_arg_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.simulation_arg_prefix = prefix.into();
        self
    }

    pub fn with_reports_dir(mut self, reports_dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = reports_dir.into();
        self
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size;
        self
    }

    pub fn with_output_parser(mut self, output_parser: OutputParser) -> Self {
        self.output_parser = output_parser;
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    pub fn output_parser(&self) -> &OutputParser {
        &self.output_parser
    }

    /// The command that runs `simulation_class` in the project directory.
    pub fn command_for(&self, simulation_class: &str) -> ProcessCommand {
        ProcessCommand::new(&self.executable, &self.project_dir)
            .args(&self.fixed_args)
            .arg(format!("{}{simulation_class}", self.simulation_arg_prefix))
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::*;

    #[test]
    fn default_command_runs_gatling_through_maven_wrapper() {
        let config = RunnerConfig::new("/app/load-test");
        let command = config.command_for("load_test.BurstUserNavigation");

        assert_eq!(Path::new("./mvnw"), command.executable());
        assert_eq!(Path::new("/app/load-test"), command.working_dir());
        assert_eq!(
            &[
                OsString::from("gatling:test"),
                OsString::from("-Dgatling.simulationClass=load_test.BurstUserNavigation"),
            ],
            command.get_args()
        );
    }

    #[test]
    fn reports_default_under_target() {
        let config = RunnerConfig::new("/app/load-test");
        assert_eq!(
            Path::new("/app/load-test/target/gatling"),
            config.reports_dir()
        );
    }

    #[test]
    fn overrides_are_applied() {
        let config = RunnerConfig::new("/work")
            .with_executable("sh")
            .with_fixed_args(["-c", "exit 0"])
            .with_simulation_arg_prefix("")
            .with_reports_dir("/reports")
            .with_drain_timeout(Duration::from_millis(50))
            .with_read_buffer_size(64);
        let command = config.command_for("SimA");

        assert_eq!(Path::new("sh"), command.executable());
        assert_eq!(
            &[
                OsString::from("-c"),
                OsString::from("exit 0"),
                OsString::from("SimA"),
            ],
            command.get_args()
        );
        assert_eq!(Path::new("/reports"), config.reports_dir());
        assert_eq!(Duration::from_millis(50), config.drain_timeout());
        assert_eq!(64, config.read_buffer_size());
    }
}
