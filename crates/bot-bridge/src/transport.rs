//! Line transport abstractions for the peer's byte streams
//!
//! `LineSink`/`LineSource` are implemented over any tokio byte stream, so the
//! bridge runs the same against a child process's pipes or an in-memory
//! duplex in tests.

use async_trait::async_trait;
use bot_bridge_core::{BridgeError, Result};
use std::pin::Pin;
use std::task::Poll;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};

/// Trait for writing lines to the peer
#[async_trait]
pub trait LineSink: Send {
    /// Write one line followed by `\n` and flush
    async fn write_line(&mut self, line: &str) -> Result<()>;
}

/// Trait for reading lines from the peer
#[async_trait]
pub trait LineSource: Send {
    /// Wait for the next complete line; `None` at end of stream
    async fn read_line(&mut self) -> Result<Option<String>>;

    /// Next line only if it can be had without waiting
    async fn poll_line(&mut self) -> Result<Option<String>>;
}

/// Writer over a byte stream (e.g. a child's stdin)
pub struct PipeWriter<W>(pub W);

#[async_trait]
impl<W> LineSink for PipeWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut data = String::with_capacity(line.len() + 1);
        data.push_str(line);
        data.push('\n');

        self.0
            .write_all(data.as_bytes())
            .await
            .map_err(|e| BridgeError::Write(format!("Pipe write failed: {}", e)))?;

        self.0
            .flush()
            .await
            .map_err(|e| BridgeError::Write(format!("Pipe flush failed: {}", e)))?;

        Ok(())
    }
}

/// Line reader over a byte stream (e.g. a child's stdout or stderr)
pub struct PipeReader<R> {
    lines: Lines<BufReader<R>>,
}

impl<R> PipeReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(inner: R) -> Self {
        Self {
            lines: BufReader::new(inner).lines(),
        }
    }
}

#[async_trait]
impl<R> LineSource for PipeReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_line(&mut self) -> Result<Option<String>> {
        // `next_line` is cancel safe, so callers may wrap this in a timeout
        self.lines
            .next_line()
            .await
            .map_err(|e| BridgeError::Read(format!("Pipe read failed: {}", e)))
    }

    async fn poll_line(&mut self) -> Result<Option<String>> {
        // One poll of the line decoder. A partial line stays in its buffer
        // across calls; Pending means no complete line is ready.
        let lines = &mut self.lines;
        std::future::poll_fn(|cx| match Pin::new(&mut *lines).poll_next_line(cx) {
            Poll::Pending => Poll::Ready(Ok(None)),
            ready => ready,
        })
        .await
        .map_err(|e| BridgeError::Read(format!("Pipe poll failed: {}", e)))
    }
}
