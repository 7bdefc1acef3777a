//! `fd_prestat_get`, `fd_prestat_dir_name`, and `path_open` (§4.E).

use crate::backend::OpenOptions;
use crate::error::{Errno, Result, WasiError};
use crate::memory::{self, GuestMemory, GuestPtr};
use crate::path::{self, ResolvedPath};
use crate::table::{OpenDirectory, OpenFile, OpenHandle};
use crate::types::{Fd, Fdflags, Oflags, Prestat};
use crate::Bindings;

pub async fn fd_prestat_get(bindings: &Bindings, mem: &mut dyn GuestMemory, fd: Fd, prestat_ptr: GuestPtr) -> Result<()> {
    let dir = bindings.table.get_preopen(fd)?;
    Prestat { name_len: dir.path.len() as u32 }.write(mem, prestat_ptr)
}

pub async fn fd_prestat_dir_name(
    bindings: &Bindings,
    mem: &mut dyn GuestMemory,
    fd: Fd,
    path_ptr: GuestPtr,
    path_len: u32,
) -> Result<()> {
    let dir = bindings.table.get_preopen(fd)?;
    memory::write_string(mem, path_ptr, &dir.path, path_len)
}

#[allow(clippy::too_many_arguments)]
pub async fn path_open(
    bindings: &mut Bindings,
    mem: &mut dyn GuestMemory,
    dirfd: Fd,
    _dirflags: u32,
    path_ptr: GuestPtr,
    path_len: u32,
    oflags_raw: u16,
    _fs_rights_base: u64,
    _fs_rights_inheriting: u64,
    fdflags_raw: u16,
    fd_out_ptr: GuestPtr,
) -> Result<()> {
    let rel_path = memory::read_string(mem, path_ptr, path_len)?;
    let oflags = Oflags::from_bits_truncate(oflags_raw);
    let mut fdflags = Fdflags::from_bits_truncate(fdflags_raw);

    if fdflags.contains(Fdflags::NONBLOCK) {
        tracing::warn!("path_open: NONBLOCK requested but no backend in scope ever blocks; ignoring");
        fdflags.remove(Fdflags::NONBLOCK);
    }
    if !fdflags.is_empty() {
        return Err(WasiError::with_path(Errno::Nosys, rel_path));
    }

    let base_handle = bindings.table.get(dirfd)?.as_dir()?.handle.dup();
    let base_path = bindings.table.get(dirfd)?.path().to_string();
    let full_path = if rel_path == "." {
        base_path.clone()
    } else {
        format!("{}/{}", base_path.trim_end_matches('/'), rel_path)
    };

    let create = oflags.contains(Oflags::CREATE);
    let exclusive = oflags.contains(Oflags::EXCLUSIVE);
    let want_dir = oflags.contains(Oflags::DIRECTORY);
    let truncate = oflags.contains(Oflags::TRUNCATE);

    let resolved = path::resolve_relative(base_handle.as_ref(), &rel_path).await?;

    let open_handle = match resolved {
        ResolvedPath::Root if truncate => return Err(WasiError::with_path(Errno::Isdir, rel_path)),
        ResolvedPath::Root => OpenHandle::Dir(OpenDirectory::new(base_handle, full_path)),
        ResolvedPath::Leaf { parent, name } => {
            let parent_ref = parent.as_deref().unwrap_or(base_handle.as_ref());
            if want_dir {
                let dir = open_or_create_dir(parent_ref, &name, create, exclusive).await?;
                OpenHandle::Dir(OpenDirectory::new(dir, full_path))
            } else {
                let file = open_or_create_file(parent_ref, &name, create, exclusive).await?;
                if truncate {
                    let writer = file.create_writable(false).await.map_err(WasiError::from_backend)?;
                    writer.close().await.map_err(WasiError::from_backend)?;
                }
                OpenHandle::File(OpenFile::new(file, full_path))
            }
        }
    };

    let fd = bindings.table.add(open_handle);
    memory::write_u32(mem, fd_out_ptr, fd)
}

async fn open_or_create_dir(
    parent: &dyn crate::backend::DirHandle,
    name: &str,
    create: bool,
    exclusive: bool,
) -> Result<Box<dyn crate::backend::DirHandle>> {
    match parent.get_directory(name, OpenOptions::create(false)).await {
        Ok(dir) => {
            if create && exclusive {
                Err(WasiError::with_path(Errno::Exist, name))
            } else {
                Ok(dir)
            }
        }
        Err(_) if create => parent
            .get_directory(name, OpenOptions::create(true))
            .await
            .map_err(WasiError::from_backend),
        Err(e) => Err(WasiError::from_backend(e)),
    }
}

async fn open_or_create_file(
    parent: &dyn crate::backend::DirHandle,
    name: &str,
    create: bool,
    exclusive: bool,
) -> Result<Box<dyn crate::backend::FileHandle>> {
    match parent.get_file(name, OpenOptions::create(false)).await {
        Ok(file) => {
            if create && exclusive {
                Err(WasiError::with_path(Errno::Exist, name))
            } else {
                Ok(file)
            }
        }
        Err(_) if create => parent
            .get_file(name, OpenOptions::create(true))
            .await
            .map_err(WasiError::from_backend),
        Err(e) => Err(WasiError::from_backend(e)),
    }
}
