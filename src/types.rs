//! Wire-level WASI preview1 types (§6 binary layouts).
//!
//! Every struct here has a `read`/`write` pair built on the primitives in
//! [`crate::memory`]; offsets are hand-specified to match the published
//! `wasi_snapshot_preview1` witx and cross-checked against
//! [`crate::memory::layout`] in the unit tests.

use crate::error::{Errno, Result, WasiError};
use crate::memory::{self, GuestMemory, GuestPtr};
use bitflags::bitflags;

/// A guest descriptor.
pub type Fd = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Filetype {
    Unknown = 0,
    BlockDevice = 1,
    CharacterDevice = 2,
    Directory = 3,
    RegularFile = 4,
    SocketDgram = 5,
    SocketStream = 6,
    SymbolicLink = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Whence {
    Set = 0,
    Cur = 1,
    End = 2,
}

impl Whence {
    pub fn from_raw(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(Whence::Set),
            1 => Ok(Whence::Cur),
            2 => Ok(Whence::End),
            _ => Err(WasiError::new(Errno::Inval)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ClockId {
    Realtime = 0,
    Monotonic = 1,
    ProcessCputimeId = 2,
    ThreadCputimeId = 3,
}

impl ClockId {
    pub fn from_raw(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(ClockId::Realtime),
            1 => Ok(ClockId::Monotonic),
            2 => Ok(ClockId::ProcessCputimeId),
            3 => Ok(ClockId::ThreadCputimeId),
            _ => Err(WasiError::new(Errno::Inval)),
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Oflags: u16 {
        const CREATE    = 1 << 0;
        const DIRECTORY = 1 << 1;
        const EXCLUSIVE = 1 << 2;
        const TRUNCATE  = 1 << 3;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Fdflags: u16 {
        const APPEND   = 1 << 0;
        const DSYNC    = 1 << 1;
        const NONBLOCK = 1 << 2;
        const RSYNC    = 1 << 3;
        const SYNC     = 1 << 4;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Lookupflags: u32 {
        const SYMLINK_FOLLOW = 1 << 0;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Rights: u64 {
        const FD_DATASYNC             = 1 << 0;
        const FD_READ                 = 1 << 1;
        const FD_SEEK                 = 1 << 2;
        const FD_FDSTAT_SET_FLAGS     = 1 << 3;
        const FD_SYNC                 = 1 << 4;
        const FD_TELL                 = 1 << 5;
        const FD_WRITE                = 1 << 6;
        const FD_ADVISE               = 1 << 7;
        const FD_ALLOCATE             = 1 << 8;
        const PATH_CREATE_DIRECTORY   = 1 << 9;
        const PATH_CREATE_FILE        = 1 << 10;
        const PATH_LINK_SOURCE        = 1 << 11;
        const PATH_LINK_TARGET        = 1 << 12;
        const PATH_OPEN               = 1 << 13;
        const FD_READDIR              = 1 << 14;
        const PATH_READLINK           = 1 << 15;
        const PATH_RENAME_SOURCE      = 1 << 16;
        const PATH_RENAME_TARGET      = 1 << 17;
        const PATH_FILESTAT_GET       = 1 << 18;
        const PATH_FILESTAT_SET_SIZE  = 1 << 19;
        const PATH_FILESTAT_SET_TIMES = 1 << 20;
        const FD_FILESTAT_GET         = 1 << 21;
        const FD_FILESTAT_SET_SIZE    = 1 << 22;
        const FD_FILESTAT_SET_TIMES   = 1 << 23;
        const PATH_SYMLINK            = 1 << 24;
        const PATH_REMOVE_DIRECTORY   = 1 << 25;
        const PATH_UNLINK_FILE        = 1 << 26;
        const POLL_FD_READWRITE       = 1 << 27;
        const SOCK_SHUTDOWN           = 1 << 28;
    }
}

impl Rights {
    /// `rights_inheriting` for a fresh open masks out the symlink right
    /// (§4.E `fd_fdstat_get`): this crate never creates symlinks.
    pub fn inheriting_mask() -> Rights {
        Rights::all() & !Rights::PATH_SYMLINK
    }
}

/// `{u32 buf_ptr, u32 buf_len}`, size 8.
#[derive(Debug, Clone, Copy)]
pub struct Iovec {
    pub buf: GuestPtr,
    pub len: u32,
}

impl Iovec {
    pub const SIZE: u32 = 8;

    pub fn read(mem: &dyn GuestMemory, ptr: GuestPtr) -> Result<Self> {
        Ok(Iovec {
            buf: memory::read_u32(mem, ptr)?,
            len: memory::read_u32(mem, ptr + 4)?,
        })
    }
}

/// `{i8 type, u32 name_len}`, size 8.
#[derive(Debug, Clone, Copy)]
pub struct Prestat {
    pub name_len: u32,
}

impl Prestat {
    pub const SIZE: u32 = 8;
    const TAG_DIR: i8 = 0;

    pub fn write(&self, mem: &mut dyn GuestMemory, ptr: GuestPtr) -> Result<()> {
        memory::write_i8(mem, ptr, Self::TAG_DIR)?;
        memory::write_u32(mem, ptr + 4, self.name_len)
    }
}

/// `{u8 filetype, u16 flags, u64 rights_base, u64 rights_inheriting}`, size 24.
#[derive(Debug, Clone, Copy)]
pub struct Fdstat {
    pub filetype: Filetype,
    pub flags: Fdflags,
    pub rights_base: Rights,
    pub rights_inheriting: Rights,
}

impl Fdstat {
    pub const SIZE: u32 = 24;

    pub fn write(&self, mem: &mut dyn GuestMemory, ptr: GuestPtr) -> Result<()> {
        memory::write_u8(mem, ptr, self.filetype as u8)?;
        memory::write_u16(mem, ptr + 2, self.flags.bits())?;
        memory::write_u64(mem, ptr + 8, self.rights_base.bits())?;
        memory::write_u64(mem, ptr + 16, self.rights_inheriting.bits())
    }
}

/// `{u64 next, u64 ino, u32 name_len, u8 type}`, size 24.
#[derive(Debug, Clone, Copy)]
pub struct Dirent {
    pub next: u64,
    pub ino: u64,
    pub name_len: u32,
    pub filetype: Filetype,
}

impl Dirent {
    pub const SIZE: u32 = 24;

    pub fn write(&self, mem: &mut dyn GuestMemory, ptr: GuestPtr) -> Result<()> {
        memory::write_u64(mem, ptr, self.next)?;
        memory::write_u64(mem, ptr + 8, self.ino)?;
        memory::write_u32(mem, ptr + 16, self.name_len)?;
        memory::write_u8(mem, ptr + 20, self.filetype as u8)
    }
}

/// `{u64 dev, u64 ino, u8 filetype, u64 nlink, u64 size, u64 atime, u64 mtime, u64 ctime}`,
/// size 64.
#[derive(Debug, Clone, Copy)]
pub struct Filestat {
    pub dev: u64,
    /// Always zero; this host never disambiguates hard links (§9).
    pub ino: u64,
    pub filetype: Filetype,
    pub nlink: u64,
    pub size: u64,
    pub atime: u64,
    pub mtime: u64,
    pub ctime: u64,
}

impl Filestat {
    pub const SIZE: u32 = 64;

    pub fn write(&self, mem: &mut dyn GuestMemory, ptr: GuestPtr) -> Result<()> {
        memory::write_u64(mem, ptr, self.dev)?;
        memory::write_u64(mem, ptr + 8, self.ino)?;
        memory::write_u8(mem, ptr + 16, self.filetype as u8)?;
        memory::write_u64(mem, ptr + 24, self.nlink)?;
        memory::write_u64(mem, ptr + 32, self.size)?;
        memory::write_u64(mem, ptr + 40, self.atime)?;
        memory::write_u64(mem, ptr + 48, self.mtime)?;
        memory::write_u64(mem, ptr + 56, self.ctime)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Eventtype {
    Clock = 0,
    FdRead = 1,
    FdWrite = 2,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Subclockflags: u16 {
        const SUBSCRIPTION_CLOCK_ABSTIME = 1 << 0;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Eventrwflags: u16 {
        const FD_READWRITE_HANGUP = 1 << 0;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SubscriptionClock {
    pub id: ClockId,
    pub timeout: u64,
    pub precision: u64,
    pub flags: Subclockflags,
}

#[derive(Debug, Clone, Copy)]
pub struct SubscriptionFdReadwrite {
    pub fd: Fd,
}

#[derive(Debug, Clone, Copy)]
pub enum SubscriptionUnion {
    Clock(SubscriptionClock),
    FdRead(SubscriptionFdReadwrite),
    FdWrite(SubscriptionFdReadwrite),
}

/// `{u64 userdata, subscription_u}`, size 48 (§4.A tagged unions).
#[derive(Debug, Clone, Copy)]
pub struct Subscription {
    pub userdata: u64,
    pub u: SubscriptionUnion,
}

impl Subscription {
    pub const SIZE: u32 = 48;
    // subscription_u starts after `userdata` (offset 8); its tag is one
    // byte, then the union is padded to its own 8-byte alignment (offset 8
    // relative to the union's own base, i.e. absolute offset 16).
    const UNION_TAG_OFFSET: u32 = 8;
    const UNION_PAYLOAD_OFFSET: u32 = 16;

    pub fn read(mem: &dyn GuestMemory, ptr: GuestPtr) -> Result<Self> {
        let userdata = memory::read_u64(mem, ptr)?;
        let tag = memory::read_u8(mem, ptr + Self::UNION_TAG_OFFSET)?;
        let base = ptr + Self::UNION_PAYLOAD_OFFSET;
        let u = match tag {
            0 => SubscriptionUnion::Clock(SubscriptionClock {
                id: ClockId::from_raw(memory::read_u32(mem, base)?)?,
                timeout: memory::read_u64(mem, base + 8)?,
                precision: memory::read_u64(mem, base + 16)?,
                flags: Subclockflags::from_bits_truncate(memory::read_u16(mem, base + 24)?),
            }),
            1 => SubscriptionUnion::FdRead(SubscriptionFdReadwrite {
                fd: memory::read_u32(mem, base)?,
            }),
            2 => SubscriptionUnion::FdWrite(SubscriptionFdReadwrite {
                fd: memory::read_u32(mem, base)?,
            }),
            _ => return Err(WasiError::new(Errno::Inval)),
        };
        Ok(Subscription { userdata, u })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EventFdReadwrite {
    pub nbytes: u64,
    pub flags: Eventrwflags,
}

/// `{u64 userdata, u16 error, u8 type, fd_readwrite}`, size 32.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub userdata: u64,
    pub error: Errno,
    pub typ: Eventtype,
    pub fd_readwrite: Option<EventFdReadwrite>,
}

impl Event {
    pub const SIZE: u32 = 32;
    const FD_READWRITE_OFFSET: u32 = 16;

    pub fn write(&self, mem: &mut dyn GuestMemory, ptr: GuestPtr) -> Result<()> {
        memory::write_u64(mem, ptr, self.userdata)?;
        memory::write_u16(mem, ptr + 8, self.error.raw())?;
        memory::write_u8(mem, ptr + 10, self.typ as u8)?;
        let rw = self.fd_readwrite.unwrap_or(EventFdReadwrite {
            nbytes: 0,
            flags: Eventrwflags::empty(),
        });
        let base = ptr + Self::FD_READWRITE_OFFSET;
        memory::write_u64(mem, base, rw.nbytes)?;
        memory::write_u16(mem, base + 8, rw.flags.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{layout, Field};

    #[test]
    fn subscription_layout_matches_witx_size() {
        // userdata(8,8) + subscription_u(tag 1 + pad + union max(clock=32))
        let (_offsets, union_size, union_align) = layout(&[
            Field::new(4, 4), // clock_id
            Field::new(8, 8), // timeout
            Field::new(8, 8), // precision
            Field::new(2, 2), // flags
        ]);
        assert_eq!(union_size, 32);
        assert_eq!(union_align, 8);
        // subscription_u = tag(1,1) + union(32,8) laid out after padding to 8
        let (offsets, u_size, _align) = layout(&[Field::new(1, 1), Field::new(union_size, union_align)]);
        assert_eq!(offsets, vec![0, 8]);
        assert_eq!(u_size, 40);
        let total = Field::new(8, 8).size + u_size;
        assert_eq!(total, Subscription::SIZE);
    }

    #[test]
    fn event_layout_matches_witx_size() {
        let (offsets, size, _align) = layout(&[
            Field::new(8, 8), // userdata
            Field::new(2, 2), // error
            Field::new(1, 1), // type
            Field::new(16, 8), // fd_readwrite
        ]);
        assert_eq!(offsets, vec![0, 8, 10, 16]);
        assert_eq!(size, Event::SIZE);
    }

    #[test]
    fn iovec_round_trip() {
        let mut mem: Vec<u8> = vec![0u8; 16];
        memory::write_u32(&mut mem, 0, 100).unwrap();
        memory::write_u32(&mut mem, 4, 50).unwrap();
        let iov = Iovec::read(&mem, 0).unwrap();
        assert_eq!(iov.buf, 100);
        assert_eq!(iov.len, 50);
    }
}
