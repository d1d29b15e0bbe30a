//! # procpipe
//!
//! **Purpose**: Child process lifecycle and stream coordination on tokio
//!
//! Spawn a process, exchange bytes with its standard streams and obtain its
//! termination status without hand-wiring events or losing a status that
//! arrived before anyone asked for it.
//!
//! ## Features
//!
//! - **Settle-once status**: any number of early or late `wait` calls see
//!   the same exit code or signal
//! - **Exit/signal policy**: non-zero exits and signals fail with
//!   [`ChildProcessError`] unless the check is disabled
//! - **Communicate**: feed stdin and drain stdout/stderr concurrently
//! - **Execute**: spawn + communicate in one call
//! - **Duplex bridge**: a process as a flow-controlled pipeline stage with
//!   bounded memory regardless of payload size
//!
//! ## Usage
//!
//! ```rust,no_run
//! use procpipe::{execute, pipeline, Options, ProcessHandle};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let output = execute("echo Hello", Options::new()).await?;
//! assert_eq!(output.stdout_text(), Some("Hello"));
//!
//! let encode = ProcessHandle::spawn(["base64"], Options::new()).await?.into_duplex()?;
//! let decode = ProcessHandle::spawn(["base64", "-d"], Options::new()).await?.into_duplex()?;
//! let mut restored = Vec::new();
//! pipeline(&b"payload"[..], vec![encode, decode], &mut restored).await?;
//! assert_eq!(restored, b"payload");
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod command;
pub mod communicate;
pub mod config;
pub mod duplex;
pub mod error;
pub mod execute;
pub mod handle;
pub mod status;

pub use codec::{Encoding, Output};
pub use command::CommandLine;
pub use communicate::{communicate, ProcessOutput, StdinSource};
pub use config::{defaults, reset_defaults, set_defaults, Options, Policy, StdioConfig};
pub use duplex::{pipeline, BridgeSink, BridgeSource, DuplexBridge};
pub use error::{ChildProcessError, ProcessError, Result};
pub use execute::execute;
pub use handle::ProcessHandle;
pub use status::{ProcessStatus, Termination};

#[cfg(unix)]
pub use nix::sys::signal::Signal;

/// Spawn a process, see [`ProcessHandle::spawn`]
pub async fn spawn(command: impl Into<CommandLine>, options: Options) -> Result<ProcessHandle> {
    ProcessHandle::spawn(command, options).await
}

/// Wait for a process and apply its policy, see [`ProcessStatus::wait`]
pub async fn wait(handle: &ProcessHandle) -> Result<Termination> {
    handle.wait().await
}
