//! The error-translation layer (§4.F).
//!
//! Handlers work with [`WasiError`], a rich carrier that pairs a WASI
//! [`Errno`] with optional context (the offending path or descriptor).
//! Backend errors that don't already carry an `Errno` are classified once, at
//! the boundary, by [`WasiError::from_backend`].

use std::fmt;

/// The WASI preview1 `errno` numeric space.
///
/// Values match the published `wasi_snapshot_preview1` witx so that a guest
/// linked against the standard `wasi-libc` headers interprets them correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Errno {
    Success = 0,
    Toobig = 1,
    Acces = 2,
    Addrinuse = 3,
    Addrnotavail = 4,
    Afnosupport = 5,
    Again = 6,
    Already = 7,
    Badf = 8,
    Badmsg = 9,
    Busy = 10,
    Canceled = 11,
    Child = 12,
    Connaborted = 13,
    Connrefused = 14,
    Connreset = 15,
    Deadlk = 16,
    Destaddrreq = 17,
    Dom = 18,
    Dquot = 19,
    Exist = 20,
    Fault = 21,
    Fbig = 22,
    Hostunreach = 23,
    Idrm = 24,
    Ilseq = 25,
    Inprogress = 26,
    Intr = 27,
    Inval = 28,
    Io = 29,
    Isconn = 30,
    Isdir = 31,
    Loop = 32,
    Mfile = 33,
    Mlink = 34,
    Msgsize = 35,
    Multihop = 36,
    Nametoolong = 37,
    Netdown = 38,
    Netreset = 39,
    Netunreach = 40,
    Nfile = 41,
    Nobufs = 42,
    Nodev = 43,
    Noent = 44,
    Noexec = 45,
    Nolck = 46,
    Nolink = 47,
    Nomem = 48,
    Nomsg = 49,
    Noprotoopt = 50,
    Nospc = 51,
    Nosys = 52,
    Notconn = 53,
    Notdir = 54,
    Notempty = 55,
    Notrecoverable = 56,
    Notsock = 57,
    Notsup = 58,
    Notty = 59,
    Nxio = 60,
    Overflow = 61,
    Ownerdead = 62,
    Perm = 63,
    Pipe = 64,
    Proto = 65,
    Protonosupport = 66,
    Prototype = 67,
    Range = 68,
    Rofs = 69,
    Spipe = 70,
    Srch = 71,
    Stale = 72,
    Timedout = 73,
    Txtbsy = 74,
    Xdev = 75,
    Notcapable = 76,
}

impl Errno {
    pub fn raw(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Context attached to a [`WasiError`] for diagnostics; never interpreted by
/// the dispatch layer.
#[derive(Debug, Clone)]
pub enum Context {
    Path(String),
    Fd(u32),
    None,
}

/// The internal error carrier handlers construct and propagate with `?`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{errno}{}", context_suffix(.context))]
pub struct WasiError {
    pub errno: Errno,
    pub context: Context,
}

fn context_suffix(ctx: &Context) -> String {
    match ctx {
        Context::Path(p) => format!(" (path {p:?})"),
        Context::Fd(fd) => format!(" (fd {fd})"),
        Context::None => String::new(),
    }
}

impl WasiError {
    pub fn new(errno: Errno) -> Self {
        WasiError {
            errno,
            context: Context::None,
        }
    }

    pub fn with_path(errno: Errno, path: impl Into<String>) -> Self {
        WasiError {
            errno,
            context: Context::Path(path.into()),
        }
    }

    pub fn with_fd(errno: Errno, fd: u32) -> Self {
        WasiError {
            errno,
            context: Context::Fd(fd),
        }
    }

    /// Boundary wrap (§7.2): classify an opaque backend error that didn't
    /// already arrive as a `WasiError`.
    pub fn from_backend(err: anyhow::Error) -> Self {
        if let Some(wasi) = err.downcast_ref::<WasiError>() {
            return wasi.clone();
        }
        let msg = err.to_string().to_lowercase();
        let errno = if msg.contains("not found") || msg.contains("no such") {
            Errno::Noent
        } else if msg.contains("not allowed")
            || msg.contains("permission")
            || msg.contains("security")
            || msg.contains("clone")
        {
            Errno::Acces
        } else if msg.contains("not empty") || msg.contains("invalid modification") {
            Errno::Notempty
        } else if msg.contains("abort") || msg.contains("cancel") {
            Errno::Canceled
        } else if msg.contains("range") || msg.contains("type mismatch") || msg.contains("invalid")
        {
            Errno::Inval
        } else {
            tracing::error!(error = %err, "unclassified backend error");
            Errno::Io
        };
        WasiError::new(errno)
    }
}

impl From<Errno> for WasiError {
    fn from(errno: Errno) -> Self {
        WasiError::new(errno)
    }
}

pub type Result<T> = std::result::Result<T, WasiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_match_witx() {
        assert_eq!(Errno::Success.raw(), 0);
        assert_eq!(Errno::Badf.raw(), 8);
        assert_eq!(Errno::Isdir.raw(), 31);
        assert_eq!(Errno::Notcapable.raw(), 76);
    }

    #[test]
    fn from_backend_classifies_common_messages() {
        let e = WasiError::from_backend(anyhow::anyhow!("entry not found in directory"));
        assert_eq!(e.errno, Errno::Noent);

        let e = WasiError::from_backend(anyhow::anyhow!("operation not allowed by security policy"));
        assert_eq!(e.errno, Errno::Acces);

        let e = WasiError::from_backend(anyhow::anyhow!("directory is not empty"));
        assert_eq!(e.errno, Errno::Notempty);
    }

    #[test]
    fn from_backend_passes_through_wasi_error() {
        let inner = WasiError::with_fd(Errno::Badf, 7);
        let wrapped = anyhow::Error::new(inner.clone());
        let out = WasiError::from_backend(wrapped);
        assert_eq!(out.errno, Errno::Badf);
    }
}
