//! Path-based calls (§4.E): `path_create_directory`, `path_remove_directory`,
//! `path_unlink_file`, `path_filestat_get`, plus the unsupported calls this
//! host declines outright — `path_rename`, `path_link`, `path_symlink`,
//! `path_readlink` all return `NOSYS`.

use crate::backend::{DirHandle, OpenOptions};
use crate::error::{Errno, Result, WasiError};
use crate::memory::{self, GuestMemory, GuestPtr};
use crate::path::{self, ResolvedPath};
use crate::types::{Fd, Filestat, Filetype};
use crate::Bindings;

pub async fn path_create_directory(
    bindings: &Bindings,
    mem: &dyn GuestMemory,
    dirfd: Fd,
    path_ptr: GuestPtr,
    path_len: u32,
) -> Result<()> {
    let rel = memory::read_string(mem, path_ptr, path_len)?;
    let base = bindings.table.get(dirfd)?.as_dir()?.handle.dup();
    match path::resolve_relative(base.as_ref(), &rel).await? {
        // Creating the preopen root itself: it already exists.
        ResolvedPath::Root => Err(WasiError::with_path(Errno::Exist, rel)),
        ResolvedPath::Leaf { parent, name } => {
            let parent_ref = parent.as_deref().unwrap_or(base.as_ref());
            // §4.E: `CREATE|DIRECTORY|EXCLUSIVE` — an existing entry, file or
            // directory, must fail with `EXIST` rather than silently succeed.
            if parent_ref.get_directory(&name, OpenOptions::create(false)).await.is_ok()
                || parent_ref.get_file(&name, OpenOptions::create(false)).await.is_ok()
            {
                return Err(WasiError::with_path(Errno::Exist, rel));
            }
            parent_ref
                .get_directory(&name, OpenOptions::create(true))
                .await
                .map(|_| ())
                .map_err(WasiError::from_backend)
        }
    }
}

pub async fn path_remove_directory(
    bindings: &Bindings,
    mem: &dyn GuestMemory,
    dirfd: Fd,
    path_ptr: GuestPtr,
    path_len: u32,
) -> Result<()> {
    let rel = memory::read_string(mem, path_ptr, path_len)?;
    let base = bindings.table.get(dirfd)?.as_dir()?.handle.dup();
    match path::resolve_relative(base.as_ref(), &rel).await? {
        ResolvedPath::Root => Err(WasiError::with_path(Errno::Acces, rel)),
        ResolvedPath::Leaf { parent, name } => {
            let parent_ref = parent.as_deref().unwrap_or(base.as_ref());
            if parent_ref.get_file(&name, OpenOptions::create(false)).await.is_ok() {
                return Err(WasiError::with_path(Errno::Notdir, rel));
            }
            parent_ref.remove_entry(&name, false).await.map_err(WasiError::from_backend)
        }
    }
}

pub async fn path_unlink_file(
    bindings: &Bindings,
    mem: &dyn GuestMemory,
    dirfd: Fd,
    path_ptr: GuestPtr,
    path_len: u32,
) -> Result<()> {
    let rel = memory::read_string(mem, path_ptr, path_len)?;
    let base = bindings.table.get(dirfd)?.as_dir()?.handle.dup();
    match path::resolve_relative(base.as_ref(), &rel).await? {
        ResolvedPath::Root => Err(WasiError::with_path(Errno::Acces, rel)),
        ResolvedPath::Leaf { parent, name } => {
            let parent_ref = parent.as_deref().unwrap_or(base.as_ref());
            if parent_ref.get_directory(&name, OpenOptions::create(false)).await.is_ok() {
                return Err(WasiError::with_path(Errno::Isdir, rel));
            }
            parent_ref.remove_entry(&name, false).await.map_err(WasiError::from_backend)
        }
    }
}

pub async fn path_filestat_get(
    bindings: &Bindings,
    mem: &mut dyn GuestMemory,
    dirfd: Fd,
    path_ptr: GuestPtr,
    path_len: u32,
    stat_ptr: GuestPtr,
) -> Result<()> {
    let rel = memory::read_string(mem, path_ptr, path_len)?;
    let base = bindings.table.get(dirfd)?.as_dir()?.handle.dup();
    let resolved = path::resolve_relative(base.as_ref(), &rel).await?;
    let stat = match resolved {
        ResolvedPath::Root => Filestat {
            dev: 0,
            ino: 0,
            filetype: Filetype::Directory,
            nlink: 1,
            size: 0,
            atime: 0,
            mtime: 0,
            ctime: 0,
        },
        ResolvedPath::Leaf { parent, name } => {
            let parent_ref = parent.as_deref().unwrap_or(base.as_ref());
            if let Ok(file) = parent_ref.get_file(&name, OpenOptions::create(false)).await {
                let snap = file.get_snapshot().await.map_err(WasiError::from_backend)?;
                Filestat {
                    dev: 0,
                    ino: 0,
                    filetype: Filetype::RegularFile,
                    nlink: 1,
                    size: snap.size(),
                    atime: 0,
                    mtime: 0,
                    ctime: 0,
                }
            } else if parent_ref.get_directory(&name, OpenOptions::create(false)).await.is_ok() {
                Filestat {
                    dev: 0,
                    ino: 0,
                    filetype: Filetype::Directory,
                    nlink: 1,
                    size: 0,
                    atime: 0,
                    mtime: 0,
                    ctime: 0,
                }
            } else {
                return Err(WasiError::with_path(Errno::Noent, rel));
            }
        }
    };
    stat.write(mem, stat_ptr)
}

/// No backend in scope carries mutable timestamps (§1.2 supplement).
pub async fn path_filestat_set_times(
    bindings: &Bindings,
    dirfd: Fd,
    _path_ptr: GuestPtr,
    _path_len: u32,
    _atim: u64,
    _mtim: u64,
    _fst_flags: u16,
) -> Result<()> {
    bindings.table.get(dirfd)?;
    Err(WasiError::new(Errno::Nosys))
}

/// Unsupported (§4.E): this host never renames across directories.
pub async fn path_rename(
    bindings: &Bindings,
    old_dirfd: Fd,
    _old_path_ptr: GuestPtr,
    _old_path_len: u32,
    new_dirfd: Fd,
    _new_path_ptr: GuestPtr,
    _new_path_len: u32,
) -> Result<()> {
    bindings.table.get(old_dirfd)?;
    bindings.table.get(new_dirfd)?;
    Err(WasiError::new(Errno::Nosys))
}

/// Unsupported (§4.E): this host never creates hard links.
pub async fn path_link(
    bindings: &Bindings,
    old_dirfd: Fd,
    _old_path_ptr: GuestPtr,
    _old_path_len: u32,
    new_dirfd: Fd,
    _new_path_ptr: GuestPtr,
    _new_path_len: u32,
) -> Result<()> {
    bindings.table.get(old_dirfd)?;
    bindings.table.get(new_dirfd)?;
    Err(WasiError::new(Errno::Nosys))
}

/// This host never creates symlinks (§1.2 supplement, §9).
pub async fn path_symlink(
    bindings: &Bindings,
    dirfd: Fd,
    _old_ptr: GuestPtr,
    _old_len: u32,
    _new_ptr: GuestPtr,
    _new_len: u32,
) -> Result<()> {
    bindings.table.get(dirfd)?;
    Err(WasiError::new(Errno::Nosys))
}

pub async fn path_readlink(
    bindings: &Bindings,
    dirfd: Fd,
    _path_ptr: GuestPtr,
    _path_len: u32,
    _buf_ptr: GuestPtr,
    _buf_len: u32,
    _out_ptr: GuestPtr,
) -> Result<()> {
    bindings.table.get(dirfd)?;
    Err(WasiError::new(Errno::Nosys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_backend::MemDir;

    #[tokio::test]
    async fn create_then_stat_directory() {
        let root = MemDir::new();
        let bindings = Bindings::builder().preopen("/sandbox", Box::new(root)).build();
        let mut mem: Vec<u8> = vec![0u8; 256];
        memory::write_string(&mut mem, 0, "sub", 8).unwrap();
        path_create_directory(&bindings, &mem, 3, 0, 3).await.unwrap();

        path_filestat_get(&bindings, &mut mem, 3, 0, 3, 100).await.unwrap();
        assert_eq!(mem[116], Filetype::Directory as u8);
    }

    #[tokio::test]
    async fn create_directory_on_existing_entry_is_exist() {
        let root = MemDir::new();
        root.seed_dir("sub");
        let bindings = Bindings::builder().preopen("/sandbox", Box::new(root)).build();
        let mut mem: Vec<u8> = vec![0u8; 16];
        memory::write_string(&mut mem, 0, "sub", 3).unwrap();
        let err = path_create_directory(&bindings, &mem, 3, 0, 3).await.unwrap_err();
        assert_eq!(err.errno, Errno::Exist);
    }

    #[tokio::test]
    async fn remove_directory_rejects_a_file() {
        let root = MemDir::new();
        root.seed_file("a.txt", b"x".to_vec());
        let bindings = Bindings::builder().preopen("/sandbox", Box::new(root)).build();
        let mut mem: Vec<u8> = vec![0u8; 64];
        memory::write_string(&mut mem, 0, "a.txt", 8).unwrap();
        let err = path_remove_directory(&bindings, &mem, 3, 0, 5).await.unwrap_err();
        assert_eq!(err.errno, Errno::Notdir);
    }

    #[tokio::test]
    async fn removing_the_preopen_root_is_acces() {
        let bindings = Bindings::builder().preopen("/sandbox", Box::new(MemDir::new())).build();
        let mut mem: Vec<u8> = vec![0u8; 16];
        memory::write_string(&mut mem, 0, ".", 1).unwrap();
        let err = path_remove_directory(&bindings, &mem, 3, 0, 1).await.unwrap_err();
        assert_eq!(err.errno, Errno::Acces);
    }

    #[tokio::test]
    async fn rename_is_not_supported() {
        let bindings = Bindings::builder().preopen("/sandbox", Box::new(MemDir::new())).build();
        let err = path_rename(&bindings, 3, 0, 0, 3, 0, 0).await.unwrap_err();
        assert_eq!(err.errno, Errno::Nosys);
    }
}
