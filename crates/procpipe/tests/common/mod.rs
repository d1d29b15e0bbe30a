//! Shared helpers for procpipe integration tests

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Install a test-writer subscriber once per binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("procpipe=debug")
        .try_init();
}

/// Deterministic pseudo-random byte stream of a fixed length
pub struct PatternReader {
    remaining: u64,
    state: u64,
}

impl PatternReader {
    pub fn new(len: u64, seed: u64) -> Self {
        Self {
            remaining: len,
            state: seed | 1,
        }
    }

    fn fill(&mut self, out: &mut [u8]) {
        for chunk in out.chunks_mut(8) {
            // xorshift64
            self.state ^= self.state << 13;
            self.state ^= self.state >> 7;
            self.state ^= self.state << 17;
            let bytes = self.state.to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    /// SHA-256 of the whole stream, computed without async I/O
    pub fn digest(len: u64, seed: u64) -> Vec<u8> {
        let mut reader = Self::new(len, seed);
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; 64 * 1024];
        while reader.remaining > 0 {
            let n = reader.remaining.min(buf.len() as u64) as usize;
            reader.fill(&mut buf[..n]);
            reader.remaining -= n as u64;
            hasher.update(&buf[..n]);
        }
        hasher.finalize().to_vec()
    }
}

impl AsyncRead for PatternReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let n = this.remaining.min(buf.remaining() as u64) as usize;
        if n > 0 {
            this.fill(buf.initialize_unfilled_to(n));
            buf.advance(n);
            this.remaining -= n as u64;
        }
        Poll::Ready(Ok(()))
    }
}

/// Sink that hashes everything written to it
#[derive(Default)]
pub struct HashingWriter {
    hasher: Sha256,
    pub total: u64,
    pub largest_write: usize,
    pub shut_down: bool,
}

impl HashingWriter {
    pub fn digest(&self) -> Vec<u8> {
        self.hasher.clone().finalize().to_vec()
    }
}

impl AsyncWrite for HashingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.hasher.update(buf);
        this.total += buf.len() as u64;
        this.largest_write = this.largest_write.max(buf.len());
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().shut_down = true;
        Poll::Ready(Ok(()))
    }
}

/// Peak resident set size of this process in KiB
#[cfg(target_os = "linux")]
pub fn peak_rss_kib() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    status
        .lines()
        .find(|line| line.starts_with("VmHWM:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kib| kib.parse().ok())
}
