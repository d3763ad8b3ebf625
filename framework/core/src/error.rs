/// Reasons a start request is refused before any run is launched.
///
/// Every variant leaves the run state untouched.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub enum StartRejected {
    /// Another run is in progress. Only one run may execute at a time.
    #[display("A simulation is already running: {simulation_class}")]
    AlreadyRunning { simulation_class: String },

    /// The simulation identifier was missing or blank.
    #[display("simulationClass is required")]
    InvalidInput,

    /// The request was made outside an async runtime, so the run could not be launched.
    #[display("No async runtime available to run the simulation")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_active_simulation() {
        let err = StartRejected::AlreadyRunning {
            simulation_class: "load_test.BurstUserNavigation".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "A simulation is already running: load_test.BurstUserNavigation"
        );
    }

    #[test]
    fn display_invalid_input() {
        assert_eq!(
            StartRejected::InvalidInput.to_string(),
            "simulationClass is required"
        );
    }

    #[test]
    fn display_no_runtime() {
        assert_eq!(
            StartRejected::NoRuntime.to_string(),
            "No async runtime available to run the simulation"
        );
    }
}
