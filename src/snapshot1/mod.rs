//! `wasi_snapshot_preview1` call handlers (§4.E).
//!
//! Each handler is an `async fn` taking the pieces of a guest call it needs
//! (the running [`crate::bindings::Bindings`], a guest memory view, and the
//! call's raw arguments) and returns [`crate::error::Result`]. An embedder's
//! import-function glue decodes wasm arguments, calls the matching handler,
//! and lowers the result to the raw `errno` wasm return value with
//! [`to_errno`] — that glue is host/engine-specific and out of scope here
//! (§1), so this module stops at the handler boundary.

pub mod dir;
pub mod fd_lifecycle;
pub mod io;
pub mod poll;
pub mod preopen;
pub mod process;
pub mod stat;
pub mod unsupported;

use crate::error::{Errno, Result};

/// Lowers a handler result to the raw wasm return value: `Success` on `Ok`,
/// the carried errno on `Err`.
pub fn to_errno<T>(result: Result<T>) -> Errno {
    match result {
        Ok(_) => Errno::Success,
        Err(e) => e.errno,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WasiError;

    #[test]
    fn ok_lowers_to_success() {
        assert_eq!(to_errno(Result::<()>::Ok(())), Errno::Success);
    }

    #[test]
    fn err_lowers_to_its_errno() {
        assert_eq!(to_errno(Result::<()>::Err(WasiError::new(Errno::Badf))), Errno::Badf);
    }
}
