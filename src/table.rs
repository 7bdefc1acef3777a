//! The open-file table (§4.C) and the `OpenFile`/`OpenDirectory` state it
//! manages (§3).

use crate::backend::{DirEntryMeta, DirHandle, FileHandle};
use crate::error::{Errno, Result, WasiError};
use crate::types::Fd;
use std::collections::HashMap;

/// An open regular file: a backend handle, its logical path, a byte
/// position, and lazily-allocated read/write side channels.
pub struct OpenFile {
    pub handle: Box<dyn FileHandle>,
    pub path: String,
    pub position: u64,
    writer: Option<Box<dyn crate::backend::Writer>>,
}

impl OpenFile {
    pub fn new(handle: Box<dyn FileHandle>, path: String) -> Self {
        OpenFile {
            handle,
            path,
            position: 0,
            writer: None,
        }
    }

    pub async fn size(&self) -> Result<u64> {
        let snap = self
            .handle
            .get_snapshot()
            .await
            .map_err(WasiError::from_backend)?;
        Ok(snap.size())
    }

    pub async fn read(&mut self, max_len: u64) -> Result<Vec<u8>> {
        let snap = self
            .handle
            .get_snapshot()
            .await
            .map_err(WasiError::from_backend)?;
        let bytes = snap
            .slice(self.position, max_len)
            .await
            .map_err(WasiError::from_backend)?;
        self.position += bytes.len() as u64;
        Ok(bytes)
    }

    pub async fn write(&mut self, bytes: &[u8]) -> Result<u64> {
        if self.writer.is_none() {
            let w = self
                .handle
                .create_writable(true)
                .await
                .map_err(WasiError::from_backend)?;
            self.writer = Some(w);
        }
        let writer = self.writer.as_mut().expect("writer just populated");
        writer
            .write(self.position, bytes)
            .await
            .map_err(WasiError::from_backend)?;
        self.position += bytes.len() as u64;
        Ok(bytes.len() as u64)
    }

    /// Closes and discards any active writer (§3 `OpenFile` invariant:
    /// `flush` closes and discards it).
    pub async fn flush(&mut self) -> Result<()> {
        if let Some(w) = self.writer.take() {
            w.close().await.map_err(WasiError::from_backend)?;
        }
        Ok(())
    }

    pub async fn truncate(&mut self, size: u64) -> Result<()> {
        self.flush().await?;
        let mut w = self
            .handle
            .create_writable(true)
            .await
            .map_err(WasiError::from_backend)?;
        w.truncate(size).await.map_err(WasiError::from_backend)?;
        w.close().await.map_err(WasiError::from_backend)?;
        Ok(())
    }
}

struct Enumerator {
    /// Position the next emitted entry corresponds to.
    position: u64,
    /// `entries()` is materialised eagerly by every backend in scope, so the
    /// "underlying iterator" of §3 is just indexing into this vector; no
    /// separate pushback slot is needed since random access supersedes it.
    entries: Vec<DirEntryMeta>,
}

/// An open directory: a backend handle, its logical path, and an optional
/// resumable enumerator for `fd_readdir` (§3).
pub struct OpenDirectory {
    pub handle: Box<dyn DirHandle>,
    pub path: String,
    enumerator: Option<Enumerator>,
}

impl OpenDirectory {
    pub fn new(handle: Box<dyn DirHandle>, path: String) -> Self {
        OpenDirectory {
            handle,
            path,
            enumerator: None,
        }
    }

    /// Returns the slice of entries starting at `cookie`, (re)creating the
    /// enumerator if its stored position doesn't match (§3 invariant).
    pub async fn entries_from(&mut self, cookie: u64) -> Result<&[DirEntryMeta]> {
        let needs_reset = match &self.enumerator {
            Some(e) => e.position != cookie,
            None => true,
        };
        if needs_reset {
            let entries = self
                .handle
                .entries()
                .await
                .map_err(WasiError::from_backend)?;
            self.enumerator = Some(Enumerator {
                position: cookie,
                entries,
            });
        }
        let enumerator = self.enumerator.as_ref().expect("just populated");
        let start = cookie.saturating_sub(0) as usize;
        // `entries` always spans position 0..len; cookie is the absolute
        // index of the next entry to emit.
        Ok(enumerator.entries.get(start..).unwrap_or(&[]))
    }

    pub fn advance_enumerator(&mut self, new_position: u64) {
        if let Some(e) = self.enumerator.as_mut() {
            e.position = new_position;
        }
    }
}

/// Dynamic dispatch between an open file and an open directory (§9).
pub enum OpenHandle {
    File(OpenFile),
    Dir(OpenDirectory),
}

impl OpenHandle {
    pub fn as_file(&self) -> Result<&OpenFile> {
        match self {
            OpenHandle::File(f) => Ok(f),
            OpenHandle::Dir(_) => Err(WasiError::new(Errno::Isdir)),
        }
    }

    pub fn as_file_mut(&mut self) -> Result<&mut OpenFile> {
        match self {
            OpenHandle::File(f) => Ok(f),
            OpenHandle::Dir(_) => Err(WasiError::new(Errno::Isdir)),
        }
    }

    pub fn as_dir(&self) -> Result<&OpenDirectory> {
        match self {
            OpenHandle::Dir(d) => Ok(d),
            OpenHandle::File(_) => Err(WasiError::new(Errno::Notdir)),
        }
    }

    pub fn as_dir_mut(&mut self) -> Result<&mut OpenDirectory> {
        match self {
            OpenHandle::Dir(d) => Ok(d),
            OpenHandle::File(_) => Err(WasiError::new(Errno::Notdir)),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            OpenHandle::File(f) => &f.path,
            OpenHandle::Dir(d) => &d.path,
        }
    }
}

/// The open-file table (§4.C). Descriptor values are strictly monotonic:
/// closing never frees a value for reuse.
pub struct FileTable {
    next_fd: Fd,
    first_non_preopen_fd: Fd,
    entries: HashMap<Fd, OpenHandle>,
}

impl FileTable {
    /// `preopens` is consumed in order; each is assigned the next
    /// contiguous descriptor starting at 3.
    pub fn new(preopens: Vec<(String, Box<dyn DirHandle>)>) -> Self {
        let mut entries = HashMap::new();
        let mut fd: Fd = 3;
        for (path, handle) in preopens {
            entries.insert(fd, OpenHandle::Dir(OpenDirectory::new(handle, path)));
            fd += 1;
        }
        FileTable {
            next_fd: fd,
            first_non_preopen_fd: fd,
            entries,
        }
    }

    pub fn first_non_preopen_fd(&self) -> Fd {
        self.first_non_preopen_fd
    }

    pub fn is_preopen(&self, fd: Fd) -> bool {
        (3..self.first_non_preopen_fd).contains(&fd)
    }

    pub fn add(&mut self, handle: OpenHandle) -> Fd {
        let fd = self.next_fd;
        self.next_fd += 1;
        self.entries.insert(fd, handle);
        fd
    }

    pub fn get(&self, fd: Fd) -> Result<&OpenHandle> {
        self.entries.get(&fd).ok_or_else(|| WasiError::with_fd(Errno::Badf, fd))
    }

    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut OpenHandle> {
        self.entries.get_mut(&fd).ok_or_else(|| WasiError::with_fd(Errno::Badf, fd))
    }

    pub fn get_preopen(&self, fd: Fd) -> Result<&OpenDirectory> {
        if !self.is_preopen(fd) {
            return Err(WasiError::with_fd(Errno::Badf, fd));
        }
        self.get(fd)?.as_dir()
    }

    /// All preopens in registration order, as `(fd, path)` pairs, for the
    /// path resolver's longest-prefix search (§4.D.2).
    pub fn preopen_entries(&self) -> Vec<(Fd, String)> {
        (3..self.first_non_preopen_fd)
            .filter_map(|fd| self.entries.get(&fd).map(|h| (fd, h.path().to_string())))
            .collect()
    }

    /// Flushes (if a file) and removes `fd`. Fails with `Badf` if absent.
    pub async fn close(&mut self, fd: Fd) -> Result<()> {
        let mut handle = self
            .entries
            .remove(&fd)
            .ok_or_else(|| WasiError::with_fd(Errno::Badf, fd))?;
        if let OpenHandle::File(f) = &mut handle {
            f.flush().await?;
        }
        Ok(())
    }

    /// Closes `to` if open, then atomically moves the handle from `from` to
    /// `to` (§4.C).
    pub async fn renumber(&mut self, from: Fd, to: Fd) -> Result<()> {
        if self.entries.contains_key(&to) {
            self.close(to).await?;
        }
        let handle = self
            .entries
            .remove(&from)
            .ok_or_else(|| WasiError::with_fd(Errno::Badf, from))?;
        self.entries.insert(to, handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_backend::MemDir;

    #[test]
    fn preopens_occupy_contiguous_range_from_3() {
        let table = FileTable::new(vec![
            ("/a".to_string(), Box::new(MemDir::new())),
            ("/b".to_string(), Box::new(MemDir::new())),
        ]);
        assert_eq!(table.first_non_preopen_fd(), 5);
        assert!(table.is_preopen(3));
        assert!(table.is_preopen(4));
        assert!(!table.is_preopen(5));
    }

    #[test]
    fn descriptors_are_strictly_monotonic() {
        let mut table = FileTable::new(vec![("/a".to_string(), Box::new(MemDir::new()))]);
        let fd1 = table.add(OpenHandle::Dir(OpenDirectory::new(Box::new(MemDir::new()), "/a/x".into())));
        let fd2 = table.add(OpenHandle::Dir(OpenDirectory::new(Box::new(MemDir::new()), "/a/y".into())));
        assert!(fd2 > fd1);
        assert!(fd1 >= table.first_non_preopen_fd());
    }

    #[tokio::test]
    async fn close_missing_fd_is_badf() {
        let mut table = FileTable::new(vec![]);
        let err = table.close(42).await.unwrap_err();
        assert_eq!(err.errno, Errno::Badf);
    }
}
