//! Socket calls (§1.2 supplement): kept for ABI completeness since a guest
//! linked against `wasi-libc` expects these imports to resolve, but this
//! host has no socket backend — every call reports `Notsup`.

use crate::error::{Errno, Result, WasiError};
use crate::types::Fd;
use crate::Bindings;

pub async fn sock_accept(bindings: &Bindings, fd: Fd, _flags: u16) -> Result<()> {
    bindings.table.get(fd)?;
    Err(WasiError::new(Errno::Notsup))
}

pub async fn sock_recv(bindings: &Bindings, fd: Fd) -> Result<()> {
    bindings.table.get(fd)?;
    Err(WasiError::new(Errno::Notsup))
}

pub async fn sock_send(bindings: &Bindings, fd: Fd) -> Result<()> {
    bindings.table.get(fd)?;
    Err(WasiError::new(Errno::Notsup))
}

pub async fn sock_shutdown(bindings: &Bindings, fd: Fd, _how: u8) -> Result<()> {
    bindings.table.get(fd)?;
    Err(WasiError::new(Errno::Notsup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_backend::MemDir;

    #[tokio::test]
    async fn sock_calls_report_notsup_for_a_real_fd() {
        let bindings = Bindings::builder().preopen("/a", Box::new(MemDir::new())).build();
        assert_eq!(sock_shutdown(&bindings, 3, 0).await.unwrap_err().errno, Errno::Notsup);
    }
}
