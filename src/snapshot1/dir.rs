//! `fd_readdir` (§4.E): resumable, cookie-paginated directory enumeration.

use crate::error::Result;
use crate::memory::{self, GuestMemory, GuestPtr};
use crate::types::{Dirent, Fd, Filetype};
use crate::Bindings;

pub async fn fd_readdir(
    bindings: &mut Bindings,
    mem: &mut dyn GuestMemory,
    fd: Fd,
    buf_ptr: GuestPtr,
    buf_len: u32,
    cookie: u64,
    bufused_ptr: GuestPtr,
) -> Result<()> {
    let dir = bindings.table.get_mut(fd)?.as_dir_mut()?;
    let entries = dir.entries_from(cookie).await?.to_vec();

    let mut out: Vec<u8> = Vec::new();
    let mut full_count: u64 = 0;
    for entry in &entries {
        let next = cookie + full_count + 1;
        let filetype = match entry.kind {
            crate::backend::EntryKind::File => Filetype::RegularFile,
            crate::backend::EntryKind::Directory => Filetype::Directory,
        };
        let dirent = Dirent {
            next,
            ino: 0,
            name_len: entry.name.len() as u32,
            filetype,
        };
        let mut entry_bytes: Vec<u8> = vec![0u8; Dirent::SIZE as usize];
        dirent.write(&mut entry_bytes, 0)?;
        entry_bytes.extend_from_slice(entry.name.as_bytes());

        let remaining = buf_len as usize - out.len();
        if entry_bytes.len() > remaining {
            // Doesn't fit at all: stop without a partial write (§9 edge case).
            break;
        }
        out.extend_from_slice(&entry_bytes);
        full_count += 1;
    }

    memory::write_bytes(mem, buf_ptr, &out)?;
    memory::write_u32(mem, bufused_ptr, out.len() as u32)?;

    let dir = bindings.table.get_mut(fd)?.as_dir_mut()?;
    dir.advance_enumerator(cookie + full_count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_backend::MemDir;
    use crate::table::{OpenDirectory, OpenHandle};

    #[tokio::test]
    async fn resumes_listing_across_calls_with_a_small_buffer() {
        let root = MemDir::new();
        root.seed_file("a", b"1".to_vec());
        root.seed_file("b", b"2".to_vec());
        root.seed_file("c", b"3".to_vec());
        let mut bindings = Bindings::builder().build();
        let fd = bindings.table.add(OpenHandle::Dir(OpenDirectory::new(Box::new(root), "/r".into())));

        let mut mem: Vec<u8> = vec![0u8; 256];
        // Buffer only large enough for roughly one entry (header 24 + 1-byte name).
        fd_readdir(&mut bindings, &mut mem, fd, 0, 25, 0, 200).await.unwrap();
        let used1 = memory::read_u32(&mem, 200).unwrap();
        assert!(used1 <= 25);

        let next_cookie = memory::read_u64(&mem, 0).unwrap();
        assert!(next_cookie >= 1);

        fd_readdir(&mut bindings, &mut mem, fd, 0, 25, next_cookie, 200).await.unwrap();
        let used2 = memory::read_u32(&mem, 200).unwrap();
        assert!(used2 > 0);
    }

    #[tokio::test]
    async fn empty_directory_reports_zero_bytes_used() {
        let root = MemDir::new();
        let mut bindings = Bindings::builder().build();
        let fd = bindings.table.add(OpenHandle::Dir(OpenDirectory::new(Box::new(root), "/r".into())));
        let mut mem: Vec<u8> = vec![0u8; 64];
        fd_readdir(&mut bindings, &mut mem, fd, 0, 64, 0, 32).await.unwrap();
        assert_eq!(memory::read_u32(&mem, 32).unwrap(), 0);
    }
}
