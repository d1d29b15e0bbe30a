//! Termination status capture and the wait protocol
//!
//! The reaper task that owns the OS child is the only writer of a
//! process's state. It moves the state from `Running` to `Terminated`
//! exactly once; every observer reads through a `watch` receiver, so an
//! observer that subscribes after the exit still sees the frozen value.

use std::fmt;
use std::process::ExitStatus;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::{
    config::Policy,
    error::{ChildProcessError, ProcessError, Result},
};

/// Final status of a process: exactly one of exit code or signal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Termination {
    /// Normal exit with the given code
    Exited(i32),
    /// Killed by the named signal (e.g. `"SIGTERM"`)
    Signaled(String),
}

impl Termination {
    /// Exit code, if the process exited normally
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            Self::Signaled(_) => None,
        }
    }

    /// Signal name, if the process was killed by a signal
    pub fn signal_code(&self) -> Option<&str> {
        match self {
            Self::Exited(_) => None,
            Self::Signaled(signal) => Some(signal),
        }
    }

    /// Exited with code 0
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

impl From<ExitStatus> for Termination {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;

            if let Some(signal) = status.signal() {
                return Self::Signaled(signal_name(signal));
            }
        }

        Self::Exited(-1)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit code {}", code),
            Self::Signaled(signal) => write!(f, "signal {}", signal),
        }
    }
}

#[cfg(unix)]
fn signal_name(signal: i32) -> String {
    nix::sys::signal::Signal::try_from(signal)
        .map(|sig| sig.as_str().to_string())
        .unwrap_or_else(|_| format!("SIG{}", signal))
}

/// Lifecycle state written by the reaper
#[derive(Debug, Clone)]
pub(crate) enum ProcessState {
    Running,
    Terminated(Termination),
    /// The OS wait itself failed; no status will ever arrive
    Lost(String),
}

/// Shared, cloneable view of a process's identity and status
#[derive(Clone)]
pub struct ProcessStatus {
    inner: Arc<StatusInner>,
}

struct StatusInner {
    argv: Vec<String>,
    command_line: String,
    policy: Policy,
    pid: u32,
    state: watch::Receiver<ProcessState>,
}

impl ProcessStatus {
    pub(crate) fn new(
        argv: Vec<String>,
        command_line: String,
        policy: Policy,
        pid: u32,
        state: watch::Receiver<ProcessState>,
    ) -> Self {
        Self {
            inner: Arc::new(StatusInner {
                argv,
                command_line,
                policy,
                pid,
                state,
            }),
        }
    }

    /// Argument vector handed to the OS
    pub fn command(&self) -> &[String] {
        &self.inner.argv
    }

    /// Command as the caller wrote it
    pub fn command_line(&self) -> &str {
        &self.inner.command_line
    }

    /// Resolved policy
    pub fn policy(&self) -> &Policy {
        &self.inner.policy
    }

    /// Process ID
    pub fn pid(&self) -> u32 {
        self.inner.pid
    }

    /// True until the terminal event has been observed.
    ///
    /// Once false, exactly one of [`exit_code`](Self::exit_code) and
    /// [`signal_code`](Self::signal_code) is set, except when the OS wait
    /// itself failed: then the status is lost, both stay `None` and
    /// [`wait`](Self::wait) fails with [`ProcessError::WaitFailed`].
    pub fn is_alive(&self) -> bool {
        matches!(*self.inner.state.borrow(), ProcessState::Running)
    }

    /// Final status, once terminated
    pub fn termination(&self) -> Option<Termination> {
        match &*self.inner.state.borrow() {
            ProcessState::Terminated(termination) => Some(termination.clone()),
            _ => None,
        }
    }

    /// Exit code, once exited normally
    pub fn exit_code(&self) -> Option<i32> {
        self.termination().and_then(|t| t.exit_code())
    }

    /// Signal name, once killed by a signal
    pub fn signal_code(&self) -> Option<String> {
        self.termination()
            .and_then(|t| t.signal_code().map(str::to_string))
    }

    /// Wait for termination and apply the exit/signal policy.
    ///
    /// May be called any number of times, before or after the process
    /// exits; every call sees the same status.
    pub async fn wait(&self) -> Result<Termination> {
        let termination = self.settled().await?;
        self.check_policy(&termination)?;
        Ok(termination)
    }

    /// Wait for termination without applying the policy
    pub async fn settled(&self) -> Result<Termination> {
        let mut state = self.inner.state.clone();
        let settled = state
            .wait_for(|s| !matches!(s, ProcessState::Running))
            .await
            .map_err(|_| {
                ProcessError::WaitFailed(format!(
                    "status of pid {} was never recorded",
                    self.pid()
                ))
            })?;

        match &*settled {
            ProcessState::Terminated(termination) => Ok(termination.clone()),
            ProcessState::Lost(reason) => Err(ProcessError::WaitFailed(reason.clone())),
            ProcessState::Running => Err(ProcessError::WaitFailed(format!(
                "pid {} is still running",
                self.pid()
            ))),
        }
    }

    fn check_policy(&self, termination: &Termination) -> Result<()> {
        let policy = &self.inner.policy;
        let violated = match termination {
            Termination::Exited(code) => *code != 0 && policy.check_exit_code,
            Termination::Signaled(_) => policy.check_signal_code,
        };

        if violated {
            debug!(
                pid = %self.pid(),
                command = %self.command_line(),
                status = %termination,
                "Process status rejected by policy"
            );
            return Err(ChildProcessError::new(self.clone(), termination.clone()).into());
        }

        Ok(())
    }

    /// Send a signal to the process
    ///
    /// Does nothing once the process has terminated. The status is published
    /// right after the child is reaped, so a signal sent in between targets a
    /// pid the OS may already have handed to another process. Callers that
    /// signal concurrently with the exit should treat delivery as best effort.
    #[cfg(unix)]
    pub fn signal(&self, signal: nix::sys::signal::Signal) -> Result<()> {
        use nix::errno::Errno;
        use nix::unistd::Pid;

        if !self.is_alive() {
            debug!(pid = %self.pid(), %signal, "Process already terminated, not signalling");
            return Ok(());
        }

        match nix::sys::signal::kill(Pid::from_raw(self.pid() as i32), signal) {
            Ok(()) => {
                debug!(pid = %self.pid(), %signal, "Sent signal");
                Ok(())
            }
            // Reaped between the liveness check and the kill
            Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(ProcessError::SignalFailed(format!(
                "{} to pid {}: {}",
                signal,
                self.pid(),
                e
            ))),
        }
    }

    /// Send SIGKILL to the process
    #[cfg(unix)]
    pub fn kill(&self) -> Result<()> {
        self.signal(nix::sys::signal::Signal::SIGKILL)
    }
}

impl fmt::Debug for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessStatus")
            .field("command", &self.inner.argv)
            .field("pid", &self.inner.pid)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}
