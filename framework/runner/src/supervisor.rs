//! Spawns the load-test process and hands its output and exit status back as two independent
//! channels.
//!
//! The child gets a single pipe as both its stdout and its stderr, so its output reaches the
//! consumer in the order it was written whichever stream it used. One blocking task forwards that
//! pipe into an unbounded channel and keeps draining it however slowly the consumer reads. A
//! second task waits for the process to exit and reports the outcome exactly once.

use std::ffi::OsString;
use std::io::{self, PipeReader, Read};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use bytes::Bytes;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

/// Size of the buffer used for each read from a pipe, and so the largest chunk delivered.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// One read from the combined output, or the error that ended reading from it.
pub type OutputChunk = io::Result<Bytes>;

/// Combined stdout and stderr of the supervised process. Closed once the pipe reaches EOF or
/// fails.
pub type OutputStream = mpsc::UnboundedReceiver<OutputChunk>;

pub type ProcessOutcome = Result<(), SupervisorError>;

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("executable '{program}' not found: {source}")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("failed to create the output pipe: {0}")]
    Pipe(#[source] io::Error),

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("process exited unsuccessfully: {0}")]
    Exit(ExitStatus),

    #[error("failed to wait for process exit: {0}")]
    Wait(#[source] io::Error),

    #[error("process supervisor stopped before reporting completion")]
    CompletionLost,
}

/// What to launch: an executable, its arguments and the directory to run it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    executable: PathBuf,
    args: Vec<OsString>,
    working_dir: PathBuf,
}

impl ProcessCommand {
    pub fn new(executable: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Work out the path to launch.
    ///
    /// Absolute paths are used as they are. Relative paths with a directory part, like
    /// `./mvnw`, are taken relative to the working directory rather than to the directory this
    /// process was started in. A bare program name is looked up on the `PATH`.
    pub fn resolve_executable(&self) -> Result<PathBuf, SupervisorError> {
        if self.executable.is_absolute() {
            Ok(self.executable.clone())
        } else if self.executable.components().count() > 1 {
            Ok(self.working_dir.join(&self.executable))
        } else {
            which::which(&self.executable).map_err(|source| SupervisorError::NotFound {
                program: self.executable.display().to_string(),
                source,
            })
        }
    }
}

/// Receives the single completion report of a supervised process.
#[derive(Debug)]
pub struct Completion {
    receiver: oneshot::Receiver<ProcessOutcome>,
}

impl Completion {
    pub(crate) fn new(receiver: oneshot::Receiver<ProcessOutcome>) -> Self {
        Self { receiver }
    }

    pub async fn wait(self) -> ProcessOutcome {
        self.receiver
            .await
            .unwrap_or(Err(SupervisorError::CompletionLost))
    }
}

/// The two halves of a supervised process. They can be consumed from different tasks.
#[derive(Debug)]
pub struct SupervisedRun {
    pub output: OutputStream,
    pub completion: Completion,
}

#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    read_buffer_size: usize,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(DEFAULT_READ_BUFFER_SIZE)
    }
}

impl ProcessSupervisor {
    pub fn new(read_buffer_size: usize) -> Self {
        Self {
            read_buffer_size: read_buffer_size.max(1),
        }
    }

    /// Launch the process described by `command`.
    ///
    /// Must be called from within a Tokio runtime. Never fails directly: a failure to launch is
    /// delivered through [SupervisedRun::completion], with the output stream already closed.
    pub fn run(&self, command: &ProcessCommand) -> SupervisedRun {
        let (output_sender, output) = mpsc::unbounded_channel();
        let (completion_sender, receiver) = oneshot::channel();

        match spawn_child(command) {
            Ok((child, pipe)) => {
                let buffer_size = self.read_buffer_size;
                tokio::task::spawn_blocking(move || {
                    forward_output(pipe, output_sender, buffer_size)
                });

                tokio::spawn(async move {
                    let outcome = wait_for_exit(child).await;
                    if completion_sender.send(outcome).is_err() {
                        log::debug!("Nobody is waiting for the process completion");
                    }
                });
            }
            Err(e) => {
                if completion_sender.send(Err(e)).is_err() {
                    log::debug!("Nobody is waiting for the process completion");
                }
            }
        }

        SupervisedRun {
            output,
            completion: Completion::new(receiver),
        }
    }
}

/// Spawn the child with one pipe behind both stdout and stderr. The parent's copies of the write
/// end are dropped with the [Command] before returning, so the reader sees EOF once the child and
/// anything it started have closed their output.
fn spawn_child(command: &ProcessCommand) -> Result<(Child, PipeReader), SupervisorError> {
    let program = command.resolve_executable()?;

    let (reader, stdout) = io::pipe().map_err(SupervisorError::Pipe)?;
    let stderr = stdout.try_clone().map_err(SupervisorError::Pipe)?;

    log::info!(
        "Launching '{}' with args {:?} in '{}'",
        program.display(),
        command.args,
        command.working_dir.display()
    );

    let child = Command::new(&program)
        .args(&command.args)
        .current_dir(&command.working_dir)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| SupervisorError::Spawn {
            program: program.display().to_string(),
            source,
        })?;

    Ok((child, reader))
}

async fn wait_for_exit(mut child: Child) -> ProcessOutcome {
    match child.wait().await {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(SupervisorError::Exit(status)),
        Err(e) => Err(SupervisorError::Wait(e)),
    }
}

/// Runs on a blocking thread until the pipe reaches EOF or fails.
fn forward_output<R>(mut pipe: R, sender: mpsc::UnboundedSender<OutputChunk>, buffer_size: usize)
where
    R: Read,
{
    let mut buffer = vec![0u8; buffer_size];
    // Once the consumer has gone the pipe is still drained, so the child never blocks on a full
    // pipe buffer.
    let mut consumer_gone = false;

    loop {
        match pipe.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                if !consumer_gone
                    && sender
                        .send(Ok(Bytes::copy_from_slice(&buffer[..n])))
                        .is_err()
                {
                    log::trace!("Output consumer has stopped, discarding further output");
                    consumer_gone = true;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("Failed to read process output: {e}");
                if !consumer_gone {
                    let _ = sender.send(Err(e));
                }
                break;
            }
        }
    }
}
