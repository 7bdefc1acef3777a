//! An in-memory reference backend (`mem-backend` feature, default-on).
//!
//! This is the one concrete implementation of [`crate::backend`] this crate
//! ships: a disposable, `HashMap`/`BTreeMap`-backed directory tree used by
//! the integration test suite and by embedders that want a hermetic sandbox
//! without touching the host filesystem. A real OS-backed implementation is
//! an external collaborator (§1) and stays out of this crate.

use crate::backend::{DirEntryMeta, DirHandle, EntryKind, FileHandle, FileSnapshot, OpenOptions, Writer};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

#[derive(Debug)]
struct FileInner {
    data: Vec<u8>,
    mtime: SystemTime,
}

enum Node {
    File(Arc<Mutex<FileInner>>),
    Dir(MemDir),
}

struct DirInner {
    entries: BTreeMap<String, Node>,
}

/// A directory in the in-memory tree. Cheap to clone: it shares its backing
/// `Mutex` with every other handle to the same directory.
#[derive(Clone)]
pub struct MemDir {
    inner: Arc<Mutex<DirInner>>,
}

impl Default for MemDir {
    fn default() -> Self {
        Self::new()
    }
}

impl MemDir {
    pub fn new() -> Self {
        MemDir {
            inner: Arc::new(Mutex::new(DirInner {
                entries: BTreeMap::new(),
            })),
        }
    }

    /// Seeds a file at `name` with `contents`, overwriting any existing
    /// entry. Convenience for test setup (§8 end-to-end scenarios).
    pub fn seed_file(&self, name: &str, contents: impl Into<Vec<u8>>) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.insert(
            name.to_string(),
            Node::File(Arc::new(Mutex::new(FileInner {
                data: contents.into(),
                mtime: SystemTime::now(),
            }))),
        );
    }

    /// Seeds an empty subdirectory at `name`, returning a handle to it.
    pub fn seed_dir(&self, name: &str) -> MemDir {
        let dir = MemDir::new();
        let mut inner = self.inner.lock().unwrap();
        inner.entries.insert(name.to_string(), Node::Dir(dir.clone()));
        dir
    }

    /// Reads the current contents of a file directly, bypassing the WASI
    /// call surface; used by tests to assert on written data.
    pub fn read_file(&self, name: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        match inner.entries.get(name) {
            Some(Node::File(f)) => Some(f.lock().unwrap().data.clone()),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct MemFile {
    inner: Arc<Mutex<FileInner>>,
}

struct MemSnapshot {
    data: Vec<u8>,
    mtime: SystemTime,
}

#[async_trait]
impl FileSnapshot for MemSnapshot {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn last_modified(&self) -> SystemTime {
        self.mtime
    }

    async fn slice(&self, offset: u64, len: u64) -> anyhow::Result<Vec<u8>> {
        let offset = offset as usize;
        if offset >= self.data.len() {
            return Ok(Vec::new());
        }
        let end = (offset + len as usize).min(self.data.len());
        Ok(self.data[offset..end].to_vec())
    }
}

struct MemWriter {
    inner: Arc<Mutex<FileInner>>,
}

#[async_trait]
impl Writer for MemWriter {
    async fn write(&mut self, pos: u64, bytes: &[u8]) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let pos = pos as usize;
        if inner.data.len() < pos {
            inner.data.resize(pos, 0);
        }
        let end = pos + bytes.len();
        if inner.data.len() < end {
            inner.data.resize(end, 0);
        }
        inner.data[pos..end].copy_from_slice(bytes);
        inner.mtime = SystemTime::now();
        Ok(())
    }

    async fn truncate(&mut self, size: u64) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.data.resize(size as usize, 0);
        inner.mtime = SystemTime::now();
        Ok(())
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl FileHandle for MemFile {
    async fn get_snapshot(&self) -> anyhow::Result<Box<dyn FileSnapshot>> {
        let inner = self.inner.lock().unwrap();
        Ok(Box::new(MemSnapshot {
            data: inner.data.clone(),
            mtime: inner.mtime,
        }))
    }

    async fn create_writable(&self, keep_existing_data: bool) -> anyhow::Result<Box<dyn Writer>> {
        if !keep_existing_data {
            self.inner.lock().unwrap().data.clear();
        }
        Ok(Box::new(MemWriter {
            inner: self.inner.clone(),
        }))
    }
}

#[async_trait]
impl DirHandle for MemDir {
    async fn get_file(&self, name: &str, opts: OpenOptions) -> anyhow::Result<Box<dyn FileHandle>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.entries.get(name) {
            Some(Node::File(f)) => Ok(Box::new(MemFile { inner: f.clone() })),
            Some(Node::Dir(_)) => anyhow::bail!("type mismatch: {name} is a directory"),
            None if opts.create => {
                let file = Arc::new(Mutex::new(FileInner {
                    data: Vec::new(),
                    mtime: SystemTime::now(),
                }));
                inner.entries.insert(name.to_string(), Node::File(file.clone()));
                Ok(Box::new(MemFile { inner: file }))
            }
            None => anyhow::bail!("entry not found: {name}"),
        }
    }

    async fn get_directory(&self, name: &str, opts: OpenOptions) -> anyhow::Result<Box<dyn DirHandle>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.entries.get(name) {
            Some(Node::Dir(d)) => Ok(Box::new(d.clone())),
            Some(Node::File(_)) => anyhow::bail!("type mismatch: {name} is a file"),
            None if opts.create => {
                let dir = MemDir::new();
                inner.entries.insert(name.to_string(), Node::Dir(dir.clone()));
                Ok(Box::new(dir))
            }
            None => anyhow::bail!("entry not found: {name}"),
        }
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.entries.get(name) {
            Some(Node::Dir(d)) => {
                if !recursive && !d.inner.lock().unwrap().entries.is_empty() {
                    anyhow::bail!("directory not empty: {name}");
                }
                inner.entries.remove(name);
                Ok(())
            }
            Some(Node::File(_)) => {
                inner.entries.remove(name);
                Ok(())
            }
            None => anyhow::bail!("entry not found: {name}"),
        }
    }

    async fn entries(&self) -> anyhow::Result<Vec<DirEntryMeta>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .entries
            .iter()
            .map(|(name, node)| DirEntryMeta {
                name: name.clone(),
                kind: match node {
                    Node::File(_) => EntryKind::File,
                    Node::Dir(_) => EntryKind::Directory,
                },
            })
            .collect())
    }

    fn dup(&self) -> Box<dyn DirHandle> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::OpenOptions;

    #[tokio::test]
    async fn create_read_write_round_trip() {
        let root = MemDir::new();
        let file = root.get_file("hello.txt", OpenOptions::create(true)).await.unwrap();
        let mut writer = file.create_writable(false).await.unwrap();
        writer.write(0, b"hi").await.unwrap();
        writer.close().await.unwrap();
        assert_eq!(root.read_file("hello.txt").unwrap(), b"hi");
    }

    #[tokio::test]
    async fn get_file_without_create_on_missing_is_error() {
        let root = MemDir::new();
        let err = root.get_file("missing.txt", OpenOptions::create(false)).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn remove_non_empty_directory_without_recursive_fails() {
        let root = MemDir::new();
        let sub = root.seed_dir("sub");
        sub.seed_file("a.txt", b"x".to_vec());
        let err = root.remove_entry("sub", false).await.unwrap_err();
        assert!(err.to_string().contains("not empty"));
    }
}
