//! `proc_exit` propagation (§7.3). Exit is not an errno: it unwinds the
//! guest call out-of-band, the way a `trap` or host function failure does
//! in embedders such as wasmtime.

use std::fmt;

/// Thrown by the `proc_exit` handler to signal the caller should stop
/// running the instance and report `code`. Deliberately not a `WasiError`:
/// nothing about it is recoverable from the guest's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcExit {
    pub code: u32,
}

impl fmt::Display for ProcExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proc_exit({})", self.code)
    }
}

impl std::error::Error for ProcExit {}
