//! Argument/environment marshalling (§3): `args_sizes_get`/`args_get` and
//! `environ_sizes_get`/`environ_get` both hand back the same shape, a set of
//! NUL-terminated strings packed into one buffer plus the offsets into it.

use crate::error::{Errno, Result, WasiError};
use crate::memory::{self, GuestMemory, GuestPtr};

/// A packed, NUL-terminated string table ready to be written into guest
/// memory: one pointer array plus one flat byte buffer.
pub struct StringCollection {
    buf: Vec<u8>,
    offsets: Vec<u32>,
}

impl StringCollection {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut buf = Vec::new();
        let mut offsets = Vec::new();
        for value in values {
            offsets.push(buf.len() as u32);
            buf.extend_from_slice(value.as_ref().as_bytes());
            buf.push(0);
        }
        StringCollection { buf, offsets }
    }

    pub fn count(&self) -> u32 {
        self.offsets.len() as u32
    }

    pub fn buf_size(&self) -> u32 {
        self.buf.len() as u32
    }

    /// Writes the pointer array (one `GuestPtr` per entry, each pointing
    /// into `buf_ptr`) followed by the flat buffer itself.
    pub fn write(&self, mem: &mut dyn GuestMemory, argv_ptr: GuestPtr, buf_ptr: GuestPtr) -> Result<()> {
        for (i, offset) in self.offsets.iter().enumerate() {
            let entry_ptr = argv_ptr
                .checked_add((i as u32).checked_mul(4).ok_or_else(|| WasiError::new(Errno::Inval))?)
                .ok_or_else(|| WasiError::new(Errno::Inval))?;
            let target = buf_ptr
                .checked_add(*offset)
                .ok_or_else(|| WasiError::new(Errno::Inval))?;
            memory::write_u32(mem, entry_ptr, target)?;
        }
        memory::write_bytes(mem, buf_ptr, &self.buf)
    }
}
