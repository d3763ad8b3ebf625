use std::sync::Arc;

use tokio::signal;
use tokio::sync::broadcast::{error::RecvError, Receiver, Sender};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
        }
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.sender.send(()) {
            // Will fail if nobody is listening for a shutdown signal, in which case the log message
            // can be ignored.
            log::warn!("Failed to send shutdown signal: {e:?}");
        }
    }

    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener::new(self.sender.subscribe())
    }
}

#[derive(Clone, Debug)]
pub struct DelegatedShutdownListener {
    receiver: Arc<Mutex<Receiver<()>>>,
}

impl DelegatedShutdownListener {
    pub(crate) fn new(receiver: Receiver<()>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Wait for the shutdown signal to be received. It is safe to race this with another future
    /// so that the shutdown signal can be used to cancel other work in progress.
    ///
    /// Returns as well if every [ShutdownHandle] has been dropped, since no signal can arrive
    /// after that.
    pub async fn wait_for_shutdown(&mut self) {
        match self.receiver.lock().await.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => {
                log::debug!("Shutdown channel closed, treating as a shutdown signal");
            }
        }
    }
}

/// Spawn a task on the current Tokio runtime that triggers the returned handle on Ctrl-C.
pub fn start_shutdown_listener() -> ShutdownHandle {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for the Ctrl-C signal: {e}");
            return;
        }
        log::info!("Received shutdown signal, shutting down...");
        listener_handle.shutdown();
    });

    handle
}
