//! Process as a duplex pipeline stage
//!
//! A [`DuplexBridge`] owns two independent half-channels: the child's
//! stdin as the write side and its stdout as the read side. Flow control is
//! pull-based. The child's stdout is only read when the consumer polls, and
//! a write completes only when the child's stdin pipe accepts it, so a
//! chain of bridges holds at most one copy buffer per leg in memory.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures::future::try_join_all;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::process::{ChildStdin, ChildStdout};
use tracing::{debug, warn};

use crate::{
    error::{ProcessError, Result},
    handle::ProcessHandle,
    status::ProcessStatus,
};

/// Write half: forwards into the child's stdin
#[derive(Debug)]
pub struct BridgeSink {
    stdin: Option<ChildStdin>,
    pid: u32,
}

impl BridgeSink {
    fn closed() -> io::Error {
        io::Error::new(
            io::ErrorKind::BrokenPipe,
            "stdin of bridged process is closed",
        )
    }
}

impl AsyncWrite for BridgeSink {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut().stdin.as_mut() {
            Some(stdin) => Pin::new(stdin).poll_write(cx, buf),
            None => Poll::Ready(Err(Self::closed())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().stdin.as_mut() {
            Some(stdin) => Pin::new(stdin).poll_flush(cx),
            None => Poll::Ready(Ok(())),
        }
    }

    /// Half-close: the child sees EOF on stdin, its exit is not awaited
    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(stdin) = this.stdin.as_mut() {
            ready!(Pin::new(stdin).poll_flush(cx))?;
            debug!(pid = %this.pid, "Closing stdin of bridged process");
        }
        this.stdin = None;
        Poll::Ready(Ok(()))
    }
}

/// Read half: yields the child's stdout, then EOF once the child has exited
pub struct BridgeSource {
    stdout: ChildStdout,
    status: ProcessStatus,
    exit: Option<Pin<Box<dyn Future<Output = ()> + Send>>>,
    finished: bool,
}

impl BridgeSource {
    /// Status of the bridged process
    pub fn status(&self) -> &ProcessStatus {
        &self.status
    }

    fn await_exit(status: ProcessStatus) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            // A pipeline stage reports EOF, never a policy failure
            match status.wait().await {
                Ok(termination) => {
                    debug!(pid = %status.pid(), status = %termination, "Bridged process finished");
                }
                Err(e) => {
                    warn!(pid = %status.pid(), error = %e, "Bridged process finished with rejected status");
                }
            }
        })
    }
}

impl AsyncRead for BridgeSource {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.finished || buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        if this.exit.is_none() {
            let before = buf.filled().len();
            ready!(Pin::new(&mut this.stdout).poll_read(cx, buf))?;
            if buf.filled().len() > before {
                return Poll::Ready(Ok(()));
            }
            this.exit = Some(Self::await_exit(this.status.clone()));
        }

        if let Some(exit) = this.exit.as_mut() {
            ready!(exit.as_mut().poll(cx));
        }
        this.exit = None;
        this.finished = true;
        Poll::Ready(Ok(()))
    }
}

impl std::fmt::Debug for BridgeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeSource")
            .field("pid", &self.status.pid())
            .field("finished", &self.finished)
            .finish()
    }
}

/// A spawned process exposed as one `AsyncRead + AsyncWrite` stream.
///
/// Writes go to the child's stdin, reads come from its stdout. Shutting
/// down the write side closes the child's stdin. The read side reports EOF
/// only after the child has exited; a status rejected by the policy is
/// logged, not raised.
///
/// # Examples
/// ```no_run
/// use procpipe::{DuplexBridge, Options, ProcessHandle};
/// use tokio::io::{AsyncReadExt, AsyncWriteExt};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let handle = ProcessHandle::spawn(["tr", "a-z", "A-Z"], Options::new()).await?;
/// let (mut sink, mut source) = DuplexBridge::new(handle)?.into_split();
///
/// sink.write_all(b"hello").await?;
/// sink.shutdown().await?;
///
/// let mut out = Vec::new();
/// source.read_to_end(&mut out).await?;
/// assert_eq!(out, b"HELLO");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DuplexBridge {
    sink: BridgeSink,
    source: BridgeSource,
}

impl DuplexBridge {
    /// Take over a handle's stdin and stdout.
    ///
    /// Fails if either slot is not piped. A piped stderr is drained in the
    /// background and discarded. Must be called from within a tokio runtime.
    pub fn new(mut handle: ProcessHandle) -> Result<Self> {
        let status = handle.status().clone();

        let (stdin, stdout) = match (handle.stdin.take(), handle.stdout.take()) {
            (_, None) => {
                return Err(ProcessError::InvalidConfig(format!(
                    "stdout of `{}` is not readable",
                    status.command_line()
                )))
            }
            (None, Some(_)) => {
                return Err(ProcessError::InvalidConfig(format!(
                    "stdin of `{}` is not writable",
                    status.command_line()
                )))
            }
            (Some(stdin), Some(stdout)) => (stdin, stdout),
        };

        if let Some(mut stderr) = handle.stderr.take() {
            let pid = status.pid();
            tokio::spawn(async move {
                match tokio::io::copy(&mut stderr, &mut tokio::io::sink()).await {
                    Ok(bytes) => debug!(pid = %pid, bytes, "Discarded stderr of bridged process"),
                    Err(e) => warn!(pid = %pid, error = %e, "Failed to drain stderr of bridged process"),
                }
            });
        }

        debug!(pid = %status.pid(), command = %status.command_line(), "Bridging process");

        Ok(Self {
            sink: BridgeSink {
                stdin: Some(stdin),
                pid: status.pid(),
            },
            source: BridgeSource {
                stdout,
                status,
                exit: None,
                finished: false,
            },
        })
    }

    /// Status of the bridged process
    pub fn status(&self) -> &ProcessStatus {
        &self.source.status
    }

    /// Split into independently owned write and read halves
    pub fn into_split(self) -> (BridgeSink, BridgeSource) {
        (self.sink, self.source)
    }
}

impl AsyncWrite for DuplexBridge {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().sink).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().sink).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().sink).poll_shutdown(cx)
    }
}

impl AsyncRead for DuplexBridge {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().source).poll_read(cx, buf)
    }
}

/// Stream `source` through each stage in order into `sink`.
///
/// Every leg is copied concurrently and closes its writer when its reader
/// is exhausted. Returns the number of bytes written to `sink`; the first
/// failing leg fails the whole pipeline.
///
/// On failure the remaining legs are dropped where they stand: output not
/// yet written to `sink` is discarded, and the stage processes are neither
/// waited for nor killed. Their [`ProcessStatus`] handles, taken before the
/// call, still settle once each child exits.
pub async fn pipeline<'a, R, W>(source: R, stages: Vec<DuplexBridge>, sink: W) -> Result<u64>
where
    R: AsyncRead + Unpin + Send + 'a,
    W: AsyncWrite + Unpin + Send + 'a,
{
    let mut legs: Vec<Pin<Box<dyn Future<Output = io::Result<u64>> + Send + 'a>>> =
        Vec::with_capacity(stages.len() + 1);
    let mut upstream: Box<dyn AsyncRead + Unpin + Send + 'a> = Box::new(source);

    for stage in stages {
        let (writer, reader) = stage.into_split();
        legs.push(Box::pin(copy_and_close(upstream, writer)));
        upstream = Box::new(reader);
    }
    legs.push(Box::pin(copy_and_close(upstream, sink)));

    let copied = try_join_all(legs).await?;
    Ok(copied.last().copied().unwrap_or_default())
}

async fn copy_and_close<R, W>(mut reader: R, mut writer: W) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let copied = tokio::io::copy(&mut reader, &mut writer).await?;
    writer.shutdown().await?;
    Ok(copied)
}
