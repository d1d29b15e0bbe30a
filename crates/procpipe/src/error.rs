//! Error types for process coordination

use std::fmt;
use std::io;

use thiserror::Error;

use crate::status::{ProcessStatus, Termination};

/// Process coordination errors
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Termination status violated the exit-code or signal policy
    #[error(transparent)]
    ChildProcess(#[from] ChildProcessError),

    /// Failed to spawn process
    #[error("Failed to spawn `{command}`: {source}")]
    SpawnFailed {
        /// Command line that could not be started
        command: String,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to a child stream failed
    #[error("Stream I/O failed: {0}")]
    Io(#[from] io::Error),

    /// Termination status could not be obtained
    #[error("Failed to wait for process: {0}")]
    WaitFailed(String),

    /// Failed to deliver a signal
    #[error("Failed to signal process: {0}")]
    SignalFailed(String),

    /// Invalid configuration
    #[error("Invalid process configuration: {0}")]
    InvalidConfig(String),
}

impl ProcessError {
    /// Policy violation details, if this is one
    pub fn as_child_process(&self) -> Option<&ChildProcessError> {
        match self {
            Self::ChildProcess(err) => Some(err),
            _ => None,
        }
    }
}

/// A process terminated with a status its policy rejects.
///
/// Keeps the failed process's status view so callers can inspect the
/// command, pid and final status.
#[derive(Debug, Clone)]
pub struct ChildProcessError {
    process: ProcessStatus,
    termination: Termination,
}

impl ChildProcessError {
    pub(crate) fn new(process: ProcessStatus, termination: Termination) -> Self {
        Self {
            process,
            termination,
        }
    }

    /// The process that failed the check
    pub fn process(&self) -> &ProcessStatus {
        &self.process
    }

    /// Final status of the process
    pub fn termination(&self) -> &Termination {
        &self.termination
    }

    /// Exit code, if the process exited normally
    pub fn exit_code(&self) -> Option<i32> {
        self.termination.exit_code()
    }

    /// Signal name, if the process was killed by a signal
    pub fn signal_code(&self) -> Option<&str> {
        self.termination.signal_code()
    }
}

impl fmt::Display for ChildProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.termination {
            Termination::Exited(code) => write!(
                f,
                "Command `{}` failed with exit code {}",
                self.process.command_line(),
                code
            ),
            Termination::Signaled(signal) => write!(
                f,
                "Command `{}` was terminated by signal {}",
                self.process.command_line(),
                signal
            ),
        }
    }
}

impl std::error::Error for ChildProcessError {}

/// Result type for process operations
pub type Result<T> = std::result::Result<T, ProcessError>;
