//! Concurrent stdin feeding, output draining and waiting

use std::fmt;
use std::io;
use std::io::Cursor;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::ChildStdin;
use tracing::{debug, trace};

use crate::{
    codec::{Encoding, Output},
    error::Result,
    handle::ProcessHandle,
};

/// Input for a child's stdin
pub enum StdinSource {
    /// In-memory bytes
    Bytes(Vec<u8>),
    /// In-memory text, written as UTF-8
    Text(String),
    /// Any async byte stream, read until exhausted
    Reader(Box<dyn AsyncRead + Send + Unpin>),
}

impl StdinSource {
    /// Wrap an async reader
    pub fn reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::Reader(Box::new(reader))
    }

    fn into_reader(self) -> Box<dyn AsyncRead + Send + Unpin> {
        match self {
            Self::Bytes(bytes) => Box::new(Cursor::new(bytes)),
            Self::Text(text) => Box::new(Cursor::new(text.into_bytes())),
            Self::Reader(reader) => reader,
        }
    }
}

impl fmt::Debug for StdinSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<Vec<u8>> for StdinSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for StdinSource {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for StdinSource {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for StdinSource {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Aggregated result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Captured stdout (None if not piped)
    pub stdout: Option<Output>,
    /// Captured stderr (None if not piped)
    pub stderr: Option<Output>,
    /// Exit code, if exited normally
    pub exit_code: Option<i32>,
    /// Signal name, if killed by a signal
    pub signal_code: Option<String>,
}

impl ProcessOutput {
    /// stdout as text
    pub fn stdout_text(&self) -> Option<&str> {
        self.stdout.as_ref().and_then(Output::as_text)
    }

    /// stderr as text
    pub fn stderr_text(&self) -> Option<&str> {
        self.stderr.as_ref().and_then(Output::as_text)
    }
}

/// Feed stdin, drain stdout and stderr, and wait for the process.
///
/// All four run concurrently and are joined: the result is produced only
/// once input is delivered, both streams hit EOF and the status is known.
/// A policy violation is reported after the drains finish, so the child is
/// never left blocked on a full pipe. Without `input`, the child's stdin is
/// closed immediately.
pub async fn communicate(
    handle: &mut ProcessHandle,
    input: Option<StdinSource>,
) -> Result<ProcessOutput> {
    let stdin = handle.stdin.take();
    let stdout = handle.stdout.take();
    let stderr = handle.stderr.take();
    let policy = *handle.options();
    let status = handle.status().clone();

    debug!(pid = %status.pid(), has_input = input.is_some(), "Communicating with process");

    let (fed, stdout, stderr, waited) = tokio::join!(
        feed(stdin, input),
        drain(stdout, policy.encoding),
        drain(stderr, policy.encoding),
        status.wait(),
    );

    let termination = waited?;
    fed?;
    let mut stdout = stdout?;
    let mut stderr = stderr?;

    if policy.trim_output {
        stdout = stdout.map(Output::trimmed);
        stderr = stderr.map(Output::trimmed);
    }

    Ok(ProcessOutput {
        stdout,
        stderr,
        exit_code: termination.exit_code(),
        signal_code: termination.signal_code().map(str::to_string),
    })
}

async fn feed(stdin: Option<ChildStdin>, input: Option<StdinSource>) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        if input.is_some() {
            debug!("stdin is not piped, dropping input");
        }
        return Ok(());
    };

    if let Some(source) = input {
        let mut reader = source.into_reader();
        let written = tokio::io::copy(&mut reader, &mut stdin).await?;
        stdin.flush().await?;
        trace!(bytes = written, "Delivered stdin");
    }

    // Dropping the pipe signals EOF to the child
    drop(stdin);
    Ok(())
}

async fn drain<R>(stream: Option<R>, encoding: Encoding) -> io::Result<Option<Output>>
where
    R: AsyncRead + Unpin,
{
    let Some(mut stream) = stream else {
        return Ok(None);
    };

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    trace!(bytes = buf.len(), "Drained stream");
    Ok(Some(encoding.decode(buf)))
}
