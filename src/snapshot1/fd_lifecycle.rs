//! Descriptor lifecycle and stat calls (§4.E): `fd_close`, `fd_renumber`,
//! `fd_fdstat_get`/`set_flags`, `fd_filestat_get`/`set_size`/`set_times`,
//! `fd_advise`, `fd_allocate`.

use crate::error::{Errno, Result, WasiError};
use crate::memory::{GuestMemory, GuestPtr};
use crate::table::OpenHandle;
use crate::types::{Fdflags, Fdstat, Filestat, Filetype, Rights};
use crate::types::Fd;
use crate::Bindings;

pub async fn fd_close(bindings: &mut Bindings, fd: Fd) -> Result<()> {
    bindings.table.close(fd).await
}

pub async fn fd_renumber(bindings: &mut Bindings, from: Fd, to: Fd) -> Result<()> {
    bindings.table.renumber(from, to).await
}

pub async fn fd_fdstat_get(bindings: &Bindings, mem: &mut dyn GuestMemory, fd: Fd, ptr: GuestPtr) -> Result<()> {
    // Stdio (§4.E): descriptors below the first preopen are never table
    // entries, but still need to report a sensible fdstat.
    if fd < 3 {
        return Fdstat {
            filetype: Filetype::CharacterDevice,
            flags: Fdflags::empty(),
            rights_base: Rights::all(),
            rights_inheriting: Rights::inheriting_mask(),
        }
        .write(mem, ptr);
    }

    let handle = bindings.table.get(fd)?;
    let filetype = match handle {
        OpenHandle::File(_) => Filetype::RegularFile,
        OpenHandle::Dir(_) => Filetype::Directory,
    };
    Fdstat {
        filetype,
        flags: Fdflags::empty(),
        rights_base: Rights::all(),
        rights_inheriting: Rights::inheriting_mask(),
    }
    .write(mem, ptr)
}

/// Unsupported (§4.E): no backend in scope honours `NONBLOCK`/`APPEND` at
/// the fd level.
pub async fn fd_fdstat_set_flags(bindings: &Bindings, fd: Fd, _flags_raw: u16) -> Result<()> {
    bindings.table.get(fd)?;
    Err(WasiError::new(Errno::Nosys))
}

pub async fn fd_filestat_get(bindings: &mut Bindings, mem: &mut dyn GuestMemory, fd: Fd, ptr: GuestPtr) -> Result<()> {
    let stat = match bindings.table.get_mut(fd)? {
        OpenHandle::File(f) => Filestat {
            dev: 0,
            ino: 0,
            filetype: Filetype::RegularFile,
            nlink: 1,
            size: f.size().await?,
            atime: 0,
            mtime: 0,
            ctime: 0,
        },
        OpenHandle::Dir(_) => Filestat {
            dev: 0,
            ino: 0,
            filetype: Filetype::Directory,
            nlink: 1,
            size: 0,
            atime: 0,
            mtime: 0,
            ctime: 0,
        },
    };
    stat.write(mem, ptr)
}

pub async fn fd_filestat_set_size(bindings: &mut Bindings, fd: Fd, size: u64) -> Result<()> {
    bindings.table.get_mut(fd)?.as_file_mut()?.truncate(size).await
}

/// Supplemented for ABI completeness; no backend here carries timestamps.
pub async fn fd_filestat_set_times(
    bindings: &Bindings,
    fd: Fd,
    _atim: u64,
    _mtim: u64,
    _fst_flags: u16,
) -> Result<()> {
    bindings.table.get(fd)?;
    Err(WasiError::new(Errno::Nosys))
}

/// Supplemented for ABI completeness; always a no-op success (§1.2).
pub async fn fd_advise(bindings: &Bindings, fd: Fd, _offset: u64, _len: u64, _advice: u8) -> Result<()> {
    bindings.table.get(fd)?;
    Ok(())
}

/// Supplemented for ABI completeness (§1.2): grows the file if `offset +
/// len` exceeds its current size.
pub async fn fd_allocate(bindings: &mut Bindings, fd: Fd, offset: u64, len: u64) -> Result<()> {
    let needed = offset.checked_add(len).ok_or_else(|| WasiError::new(Errno::Inval))?;
    let file = bindings.table.get_mut(fd)?.as_file_mut()?;
    if needed > file.size().await? {
        file.truncate(needed).await?;
    }
    Ok(())
}
