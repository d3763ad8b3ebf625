use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use gatling_shim_runner::prelude::{RunnerConfig, DEFAULT_EXECUTABLE};

/// Every option can also be set through the environment variable named in its help.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct ServiceCli {
    /// The load-test project that simulations are run in
    #[clap(long, env = "PROJECT_DIR", default_value = "/app/load-test")]
    pub project_dir: PathBuf,

    /// Address to listen on
    #[clap(long, env = "GATLING_SHIM_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port to listen on
    #[clap(long, env = "GATLING_SHIM_PORT", default_value_t = 8080)]
    pub port: u16,

    /// The launcher used to run a simulation. A relative path with a directory part is resolved
    /// against the project directory, a bare name is looked up on the `PATH`.
    #[clap(long, env = "GATLING_EXECUTABLE", default_value = DEFAULT_EXECUTABLE)]
    pub executable: PathBuf,

    /// Where the load-test tool writes its reports. Defaults to `<project-dir>/target/gatling`.
    #[clap(long, env = "GATLING_REPORTS_DIR")]
    pub reports_dir: Option<PathBuf>,

    /// How long to keep reading output after the process has exited, in milliseconds
    #[clap(long, default_value_t = 2000)]
    pub drain_timeout_ms: u64,
}

impl ServiceCli {
    pub fn runner_config(&self) -> RunnerConfig {
        let config = RunnerConfig::new(&self.project_dir)
            .with_executable(&self.executable)
            .with_drain_timeout(Duration::from_millis(self.drain_timeout_ms));

        match &self.reports_dir {
            Some(reports_dir) => config.with_reports_dir(reports_dir),
            None => config,
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
