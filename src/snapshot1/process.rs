//! Process/environment calls (§4.E): `proc_exit`, `proc_raise`,
//! `sched_yield`, `args_*`, `environ_*`, `clock_*`, `random_get`.

use crate::error::{Errno, Result, WasiError};
use crate::exit::ProcExit;
use crate::memory::{self, GuestMemory, GuestPtr};
use crate::random;
use crate::types::ClockId;
use crate::Bindings;

/// Unlike every other handler, this doesn't return a `Result`: `proc_exit`
/// never yields an errno back to the guest (§7.3). The caller's dispatch
/// loop treats the returned [`ProcExit`] as an unwind signal.
pub async fn proc_exit(code: u32) -> ProcExit {
    ProcExit { code }
}

/// Signal delivery into a guest instance isn't modeled by this host.
pub async fn proc_raise(_signal: u8) -> Result<()> {
    Err(WasiError::new(Errno::Nosys))
}

pub async fn sched_yield() -> Result<()> {
    tokio::task::yield_now().await;
    Ok(())
}

pub async fn args_sizes_get(bindings: &Bindings, mem: &mut dyn GuestMemory, count_ptr: GuestPtr, buf_size_ptr: GuestPtr) -> Result<()> {
    memory::write_u32(mem, count_ptr, bindings.args.count())?;
    memory::write_u32(mem, buf_size_ptr, bindings.args.buf_size())
}

pub async fn args_get(bindings: &Bindings, mem: &mut dyn GuestMemory, argv_ptr: GuestPtr, argv_buf_ptr: GuestPtr) -> Result<()> {
    bindings.args.write(mem, argv_ptr, argv_buf_ptr)
}

pub async fn environ_sizes_get(bindings: &Bindings, mem: &mut dyn GuestMemory, count_ptr: GuestPtr, buf_size_ptr: GuestPtr) -> Result<()> {
    memory::write_u32(mem, count_ptr, bindings.env.count())?;
    memory::write_u32(mem, buf_size_ptr, bindings.env.buf_size())
}

pub async fn environ_get(bindings: &Bindings, mem: &mut dyn GuestMemory, environ_ptr: GuestPtr, environ_buf_ptr: GuestPtr) -> Result<()> {
    bindings.env.write(mem, environ_ptr, environ_buf_ptr)
}

pub async fn clock_res_get(bindings: &Bindings, mem: &mut dyn GuestMemory, clock_id_raw: u32, ptr: GuestPtr) -> Result<()> {
    let id = ClockId::from_raw(clock_id_raw)?;
    let res = bindings.clock.resolution(id)?;
    memory::write_u64(mem, ptr, res)
}

pub async fn clock_time_get(
    bindings: &Bindings,
    mem: &mut dyn GuestMemory,
    clock_id_raw: u32,
    _precision: u64,
    ptr: GuestPtr,
) -> Result<()> {
    let id = ClockId::from_raw(clock_id_raw)?;
    let now = bindings.clock.now(id)?;
    memory::write_u64(mem, ptr, now)
}

pub async fn random_get(mem: &mut dyn GuestMemory, buf_ptr: GuestPtr, buf_len: u32) -> Result<()> {
    let mut buf = vec![0u8; buf_len as usize];
    random::fill(&mut buf);
    memory::write_bytes(mem, buf_ptr, &buf)
}
