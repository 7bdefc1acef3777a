//! Stdio streams (§4.G, §6). These stand apart from the file table: fd 0/1/2
//! are never entries in [`crate::table::FileTable`], they're wired directly
//! into [`crate::bindings::Bindings`].

use async_trait::async_trait;
use std::sync::Mutex;

/// A byte source for fd 0. Implementations decide how "end of input" and
/// backpressure work; the host only ever asks for "up to N bytes".
#[async_trait]
pub trait InputStream: Send + Sync {
    async fn read(&self, max_len: usize) -> anyhow::Result<Vec<u8>>;
}

/// A byte sink for fd 1/2.
#[async_trait]
pub trait OutputStream: Send + Sync {
    async fn write(&self, bytes: &[u8]) -> anyhow::Result<()>;
}

/// An input stream with nothing to read; `read` always returns EOF. The
/// default for embedders that don't wire up a real stdin.
pub struct EmptyInput;

#[async_trait]
impl InputStream for EmptyInput {
    async fn read(&self, _max_len: usize) -> anyhow::Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// An in-memory input stream, useful for tests: yields the bytes it was
/// constructed with, then EOF.
pub struct FixedInput {
    remaining: Mutex<Vec<u8>>,
}

impl FixedInput {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        FixedInput {
            remaining: Mutex::new(data.into()),
        }
    }
}

#[async_trait]
impl InputStream for FixedInput {
    async fn read(&self, max_len: usize) -> anyhow::Result<Vec<u8>> {
        let mut remaining = self.remaining.lock().unwrap();
        let take = max_len.min(remaining.len());
        Ok(remaining.drain(..take).collect())
    }
}

/// An output stream that appends every write to an in-memory buffer;
/// the reference stand-in for stdout/stderr in tests and embedders that
/// want to capture guest output rather than inherit the process's own.
pub struct BufferOutput {
    buf: Mutex<Vec<u8>>,
}

impl Default for BufferOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferOutput {
    pub fn new() -> Self {
        BufferOutput { buf: Mutex::new(Vec::new()) }
    }

    pub fn contents(&self) -> Vec<u8> {
        self.buf.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutputStream for BufferOutput {
    async fn write(&self, bytes: &[u8]) -> anyhow::Result<()> {
        self.buf.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }
}

/// An output stream that forwards to `tracing`, for embedders that want
/// guest stdout/stderr folded into structured logs rather than inherited
/// file descriptors.
pub struct TracingOutput {
    level: tracing::Level,
}

impl TracingOutput {
    pub fn stdout() -> Self {
        TracingOutput { level: tracing::Level::INFO }
    }

    pub fn stderr() -> Self {
        TracingOutput { level: tracing::Level::WARN }
    }
}

#[async_trait]
impl OutputStream for TracingOutput {
    async fn write(&self, bytes: &[u8]) -> anyhow::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        match self.level {
            tracing::Level::WARN => tracing::warn!(target: "wasi_guest", "{}", text.trim_end()),
            _ => tracing::info!(target: "wasi_guest", "{}", text.trim_end()),
        }
        Ok(())
    }
}
