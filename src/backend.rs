//! The storage abstraction (§4.B).
//!
//! The core treats backends purely behaviourally: it does not assume a
//! particular OS or a browser storage API. `anyhow::Error` is used as the
//! erased error type so any concrete backend can report failures without
//! this crate depending on its error representation; [`crate::error::
//! WasiError::from_backend`] classifies whatever comes back.

use async_trait::async_trait;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    pub create: bool,
}

impl OpenOptions {
    pub fn create(create: bool) -> Self {
        OpenOptions { create }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone)]
pub struct DirEntryMeta {
    pub name: String,
    pub kind: EntryKind,
}

/// A read-only snapshot of a file's contents at a point in time.
#[async_trait]
pub trait FileSnapshot: Send + Sync {
    fn size(&self) -> u64;
    fn last_modified(&self) -> SystemTime;
    /// Reads up to `len` bytes starting at `offset`. Short reads at EOF are
    /// expected; an empty vector means EOF.
    async fn slice(&self, offset: u64, len: u64) -> anyhow::Result<Vec<u8>>;
}

/// A writable channel kept open across contiguous `fd_write` calls.
#[async_trait]
pub trait Writer: Send + Sync {
    async fn write(&mut self, pos: u64, bytes: &[u8]) -> anyhow::Result<()>;
    async fn truncate(&mut self, size: u64) -> anyhow::Result<()>;
    /// Closes the writer, discarding any buffering. Called both on a normal
    /// flush and when cancellation rolls back an in-progress write (§5).
    async fn close(self: Box<Self>) -> anyhow::Result<()>;
}

#[async_trait]
pub trait FileHandle: Send + Sync {
    async fn get_snapshot(&self) -> anyhow::Result<Box<dyn FileSnapshot>>;
    /// `keep_existing_data = false` truncates the file to zero length as the
    /// writer opens (used by `path_open`'s `TRUNCATE` flag and `fd_filestat_
    /// set_size`'s truncate-from-zero path).
    async fn create_writable(&self, keep_existing_data: bool) -> anyhow::Result<Box<dyn Writer>>;
}

#[async_trait]
pub trait DirHandle: Send + Sync {
    async fn get_file(&self, name: &str, opts: OpenOptions) -> anyhow::Result<Box<dyn FileHandle>>;
    async fn get_directory(&self, name: &str, opts: OpenOptions) -> anyhow::Result<Box<dyn DirHandle>>;
    async fn remove_entry(&self, name: &str, recursive: bool) -> anyhow::Result<()>;
    async fn entries(&self) -> anyhow::Result<Vec<DirEntryMeta>>;
    /// Duplicates this handle. Used when `path_open` resolves to the
    /// directory itself (an empty relative path) and the table needs its
    /// own owned handle distinct from the one borrowed to get there.
    fn dup(&self) -> Box<dyn DirHandle>;
}
