//! Spawned process handle

use tokio::process::{ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    command::CommandLine,
    communicate::{communicate, ProcessOutput, StdinSource},
    config::{Options, Policy},
    duplex::DuplexBridge,
    error::{ProcessError, Result},
    status::{ProcessState, ProcessStatus, Termination},
};

/// One spawned OS process with its piped standard streams.
///
/// Stream slots are `None` when the slot was not piped or has been taken.
/// Status accessors stay valid after the streams are gone.
#[derive(Debug)]
pub struct ProcessHandle {
    /// Child's stdin, if piped
    pub stdin: Option<ChildStdin>,
    /// Child's stdout, if piped
    pub stdout: Option<ChildStdout>,
    /// Child's stderr, if piped
    pub stderr: Option<ChildStderr>,
    status: ProcessStatus,
}

impl ProcessHandle {
    /// Spawn a process
    ///
    /// A string command runs through `/bin/sh -c`; an argument vector is
    /// executed verbatim. Must be called from within a tokio runtime.
    ///
    /// # Examples
    /// ```no_run
    /// use procpipe::{Options, ProcessHandle};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let handle = ProcessHandle::spawn(["sleep", "1"], Options::new()).await?;
    /// handle.wait().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn spawn(command: impl Into<CommandLine>, options: Options) -> Result<Self> {
        let command = command.into();
        let argv = command.to_argv()?;
        let policy = options.resolve();

        let Options {
            cwd,
            env,
            env_clear,
            stdin: input,
            stdin_config,
            stdout,
            stderr,
            ..
        } = options;

        if input.is_some() {
            warn!(command = %command, "Input content is only delivered by execute, ignoring it");
        }

        debug!(
            command = %command,
            argv = ?argv,
            "Spawning process"
        );

        let (program, args) = argv.split_first().ok_or_else(|| {
            ProcessError::InvalidConfig("command vector must name a program".to_string())
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args);

        if let Some(ref dir) = cwd {
            cmd.current_dir(dir);
        }

        if env_clear {
            cmd.env_clear();
        }
        cmd.envs(&env);

        cmd.stdin(stdin_config.into_stdio());
        cmd.stdout(stdout.into_stdio());
        cmd.stderr(stderr.into_stdio());

        let mut child = cmd.spawn().map_err(|source| ProcessError::SpawnFailed {
            command: command.to_string(),
            source,
        })?;
        let pid = child.id().ok_or_else(|| {
            ProcessError::WaitFailed(format!("`{}` exited before its pid was read", command))
        })?;

        info!(pid = %pid, command = %command, "Process spawned");

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // The reaper owns the child and is the only writer of its state.
        let (state_tx, state_rx) = watch::channel(ProcessState::Running);
        tokio::spawn(async move {
            let state = match child.wait().await {
                Ok(exit) => {
                    let termination = Termination::from(exit);
                    debug!(pid = %pid, status = %termination, "Process terminated");
                    ProcessState::Terminated(termination)
                }
                Err(e) => {
                    warn!(pid = %pid, error = %e, "Failed to wait for process");
                    ProcessState::Lost(e.to_string())
                }
            };
            state_tx.send_replace(state);
        });

        Ok(Self {
            stdin,
            stdout,
            stderr,
            status: ProcessStatus::new(argv, command.to_string(), policy, pid, state_rx),
        })
    }

    /// Cloneable status view, independent of the streams
    pub fn status(&self) -> &ProcessStatus {
        &self.status
    }

    /// Get process ID
    pub fn pid(&self) -> u32 {
        self.status.pid()
    }

    /// Argument vector handed to the OS
    pub fn command(&self) -> &[String] {
        self.status.command()
    }

    /// Resolved policy
    pub fn options(&self) -> &Policy {
        self.status.policy()
    }

    /// Check if process is still running
    pub fn is_alive(&self) -> bool {
        self.status.is_alive()
    }

    /// Exit code, once exited normally
    pub fn exit_code(&self) -> Option<i32> {
        self.status.exit_code()
    }

    /// Signal name, once killed by a signal
    pub fn signal_code(&self) -> Option<String> {
        self.status.signal_code()
    }

    /// Wait for termination and apply the policy
    pub async fn wait(&self) -> Result<Termination> {
        self.status.wait().await
    }

    /// Feed stdin, drain stdout/stderr and wait, see [`communicate`]
    pub async fn communicate(&mut self, input: Option<StdinSource>) -> Result<ProcessOutput> {
        communicate(self, input).await
    }

    /// Expose stdin/stdout as one duplex stream
    pub fn into_duplex(self) -> Result<DuplexBridge> {
        DuplexBridge::new(self)
    }

    /// Send a signal to the process
    #[cfg(unix)]
    pub fn signal(&self, signal: nix::sys::signal::Signal) -> Result<()> {
        self.status.signal(signal)
    }

    /// Send SIGKILL to the process
    #[cfg(unix)]
    pub fn kill(&self) -> Result<()> {
        self.status.kill()
    }
}
