mod api;
mod cli;
mod report_files;

pub use api::{router, AppState, ENDPOINTS};
pub use cli::ServiceCli;
