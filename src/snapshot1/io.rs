//! Read/write/seek calls (§4.E): `fd_read`, `fd_pread`, `fd_write`,
//! `fd_pwrite`, `fd_seek`, `fd_tell`, `fd_sync`, `fd_datasync`.
//!
//! fd 0/1/2 are routed to the stdio streams in [`crate::bindings::Bindings`]
//! rather than the file table (§4.G).

use crate::error::{Errno, Result, WasiError};
use crate::memory::{self, GuestMemory, GuestPtr};
use crate::table::OpenHandle;
use crate::types::{Fd, Iovec, Whence};
use crate::Bindings;

fn iovec_ptr(base: GuestPtr, index: u32) -> Result<GuestPtr> {
    let offset = index.checked_mul(Iovec::SIZE).ok_or_else(|| WasiError::new(Errno::Inval))?;
    base.checked_add(offset).ok_or_else(|| WasiError::new(Errno::Inval))
}

pub async fn fd_read(
    bindings: &mut Bindings,
    mem: &mut dyn GuestMemory,
    fd: Fd,
    iovs_ptr: GuestPtr,
    iovs_len: u32,
    nread_ptr: GuestPtr,
) -> Result<()> {
    let mut total = 0u32;
    if fd == 0 {
        for i in 0..iovs_len {
            let iov = Iovec::read(mem, iovec_ptr(iovs_ptr, i)?)?;
            let data = bindings.stdin.read(iov.len as usize).await.map_err(WasiError::from_backend)?;
            memory::write_bytes(mem, iov.buf, &data)?;
            let got = data.len() as u32;
            total += got;
            if got < iov.len {
                break;
            }
        }
    } else if fd == 1 || fd == 2 {
        return Err(WasiError::with_fd(Errno::Badf, fd));
    } else {
        let file = bindings.table.get_mut(fd)?.as_file_mut()?;
        for i in 0..iovs_len {
            let iov = Iovec::read(mem, iovec_ptr(iovs_ptr, i)?)?;
            let data = file.read(iov.len as u64).await?;
            memory::write_bytes(mem, iov.buf, &data)?;
            let got = data.len() as u32;
            total += got;
            if got < iov.len {
                break;
            }
        }
    }
    memory::write_u32(mem, nread_ptr, total)
}

pub async fn fd_pread(
    bindings: &Bindings,
    mem: &mut dyn GuestMemory,
    fd: Fd,
    iovs_ptr: GuestPtr,
    iovs_len: u32,
    offset: u64,
    nread_ptr: GuestPtr,
) -> Result<()> {
    let file = bindings.table.get(fd)?.as_file()?;
    let snapshot = file.handle.get_snapshot().await.map_err(WasiError::from_backend)?;
    let mut pos = offset;
    let mut total = 0u32;
    for i in 0..iovs_len {
        let iov = Iovec::read(mem, iovec_ptr(iovs_ptr, i)?)?;
        let data = snapshot.slice(pos, iov.len as u64).await.map_err(WasiError::from_backend)?;
        memory::write_bytes(mem, iov.buf, &data)?;
        pos += data.len() as u64;
        let got = data.len() as u32;
        total += got;
        if got < iov.len {
            break;
        }
    }
    memory::write_u32(mem, nread_ptr, total)
}

pub async fn fd_write(
    bindings: &mut Bindings,
    mem: &mut dyn GuestMemory,
    fd: Fd,
    iovs_ptr: GuestPtr,
    iovs_len: u32,
    nwritten_ptr: GuestPtr,
) -> Result<()> {
    let mut total = 0u32;
    match fd {
        1 | 2 => {
            for i in 0..iovs_len {
                let iov = Iovec::read(mem, iovec_ptr(iovs_ptr, i)?)?;
                let data = memory::read_bytes(mem, iov.buf, iov.len as usize)?;
                let stream = if fd == 1 { &bindings.stdout } else { &bindings.stderr };
                stream.write(&data).await.map_err(WasiError::from_backend)?;
                total += data.len() as u32;
            }
        }
        0 => return Err(WasiError::with_fd(Errno::Badf, fd)),
        _ => {
            let file = bindings.table.get_mut(fd)?.as_file_mut()?;
            for i in 0..iovs_len {
                let iov = Iovec::read(mem, iovec_ptr(iovs_ptr, i)?)?;
                let data = memory::read_bytes(mem, iov.buf, iov.len as usize)?;
                total += file.write(&data).await? as u32;
            }
        }
    }
    memory::write_u32(mem, nwritten_ptr, total)
}

pub async fn fd_pwrite(
    bindings: &mut Bindings,
    mem: &mut dyn GuestMemory,
    fd: Fd,
    iovs_ptr: GuestPtr,
    iovs_len: u32,
    offset: u64,
    nwritten_ptr: GuestPtr,
) -> Result<()> {
    let file = bindings.table.get(fd)?.as_file()?;
    let mut writer = file.handle.create_writable(true).await.map_err(WasiError::from_backend)?;
    let mut pos = offset;
    let mut total = 0u32;
    for i in 0..iovs_len {
        let iov = Iovec::read(mem, iovec_ptr(iovs_ptr, i)?)?;
        let data = memory::read_bytes(mem, iov.buf, iov.len as usize)?;
        writer.write(pos, &data).await.map_err(WasiError::from_backend)?;
        pos += data.len() as u64;
        total += data.len() as u32;
    }
    writer.close().await.map_err(WasiError::from_backend)?;
    memory::write_u32(mem, nwritten_ptr, total)
}

pub async fn fd_seek(
    bindings: &mut Bindings,
    mem: &mut dyn GuestMemory,
    fd: Fd,
    offset: i64,
    whence_raw: u8,
    newoffset_ptr: GuestPtr,
) -> Result<()> {
    let whence = Whence::from_raw(whence_raw)?;
    let base = {
        let file = bindings.table.get(fd)?.as_file()?;
        match whence {
            Whence::Set => 0,
            Whence::Cur => file.position as i64,
            Whence::End => 0, // filled in below; End needs an await
        }
    };
    let base = if matches!(whence, Whence::End) {
        bindings.table.get_mut(fd)?.as_file_mut()?.size().await? as i64
    } else {
        base
    };
    let new_pos = base.checked_add(offset).ok_or_else(|| WasiError::new(Errno::Inval))?;
    if new_pos < 0 {
        return Err(WasiError::new(Errno::Inval));
    }
    let file = bindings.table.get_mut(fd)?.as_file_mut()?;
    file.position = new_pos as u64;
    memory::write_u64(mem, newoffset_ptr, file.position)
}

pub async fn fd_tell(bindings: &Bindings, mem: &mut dyn GuestMemory, fd: Fd, ptr: GuestPtr) -> Result<()> {
    let file = bindings.table.get(fd)?.as_file()?;
    memory::write_u64(mem, ptr, file.position)
}

pub async fn fd_sync(bindings: &mut Bindings, fd: Fd) -> Result<()> {
    match bindings.table.get_mut(fd)? {
        OpenHandle::File(f) => f.flush().await,
        OpenHandle::Dir(_) => Ok(()),
    }
}

pub async fn fd_datasync(bindings: &mut Bindings, fd: Fd) -> Result<()> {
    match bindings.table.get_mut(fd)? {
        OpenHandle::File(f) => f.flush().await,
        OpenHandle::Dir(_) => Err(WasiError::with_fd(Errno::Isdir, fd)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_backend::MemDir;

    #[tokio::test]
    async fn write_then_read_back_round_trip() {
        let root = MemDir::new();
        let mut bindings = Bindings::builder().preopen("/sandbox", Box::new(root)).build();
        let mut mem: Vec<u8> = vec![0u8; 256];

        crate::snapshot1::preopen::path_open(
            &mut bindings, &mut mem, 3, 0, 0, 9, crate::types::Oflags::CREATE.bits(), 0, 0, 0, 200,
        )
        .await
        .unwrap();
        memory::write_string(&mut mem, 0, "hello.txt", 16).unwrap();
        let fd = memory::read_u32(&mem, 200).unwrap();

        memory::write_u32(&mut mem, 20, 30).unwrap(); // iov.buf
        memory::write_u32(&mut mem, 24, 5).unwrap(); // iov.len
        memory::write_bytes(&mut mem, 30, b"howdy").unwrap();
        fd_write(&mut bindings, &mut mem, fd, 20, 1, 204).await.unwrap();
        assert_eq!(memory::read_u32(&mem, 204).unwrap(), 5);

        fd_seek(&mut bindings, &mut mem, fd, 0, 0, 208).await.unwrap();
        memory::write_u32(&mut mem, 40, 50).unwrap();
        memory::write_u32(&mut mem, 44, 5).unwrap();
        fd_read(&mut bindings, &mut mem, fd, 40, 1, 216).await.unwrap();
        assert_eq!(memory::read_u32(&mem, 216).unwrap(), 5);
        assert_eq!(&mem[50..55], b"howdy");
    }
}
