//! One-call spawn and communicate

use crate::{
    command::CommandLine,
    communicate::ProcessOutput,
    config::{Options, StdioConfig},
    error::Result,
    handle::ProcessHandle,
};

/// Run a command to completion and collect its output.
///
/// stdin is piped only when `options.stdin` carries input; otherwise the
/// child gets the null device, so it never waits on an inherited terminal.
///
/// # Examples
/// ```no_run
/// use procpipe::{execute, Options};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let output = execute("echo Hello", Options::new()).await?;
/// assert_eq!(output.stdout_text(), Some("Hello"));
/// # Ok(())
/// # }
/// ```
pub async fn execute(command: impl Into<CommandLine>, mut options: Options) -> Result<ProcessOutput> {
    let input = options.stdin.take();
    options.stdin_config = if input.is_some() {
        StdioConfig::Pipe
    } else {
        StdioConfig::Ignore
    };

    let mut handle = ProcessHandle::spawn(command, options).await?;
    handle.communicate(input).await
}
