mod error;
mod shutdown;

pub mod prelude {
    pub use crate::error::StartRejected;
    pub use crate::shutdown::{start_shutdown_listener, DelegatedShutdownListener, ShutdownHandle};
}
