mod config;
mod manager;
mod output_parser;
mod report_locator;
mod state;
mod supervisor;

pub mod prelude {
    pub use crate::config::{
        default_reports_dir, RunnerConfig, DEFAULT_DRAIN_TIMEOUT, DEFAULT_EXECUTABLE,
        DEFAULT_FIXED_ARGS, DEFAULT_SIMULATION_ARG_PREFIX,
    };
    pub use crate::manager::{RunManager, PROCESS_OUTPUT_LOG_TARGET};
    pub use crate::output_parser::{OutputParser, PatternError, DEFAULT_ACTIVE_USER_PATTERNS};
    pub use crate::report_locator::{ReportLocator, REPORT_INDEX_FILE};
    pub use crate::state::RunState;
    pub use crate::supervisor::{
        Completion, OutputChunk, OutputStream, ProcessCommand, ProcessOutcome, ProcessSupervisor,
        SupervisedRun, SupervisorError, DEFAULT_READ_BUFFER_SIZE,
    };
    pub use gatling_shim_core::prelude::StartRejected;
}
