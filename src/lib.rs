//! A host-side implementation of `wasi_snapshot_preview1`: ABI marshalling,
//! the open-file table, capability-based path resolution, and the call
//! handlers, all independent of any particular WebAssembly engine or
//! concrete backing store (§1).
//!
//! An embedder supplies a [`memory::GuestMemory`] view and one or more
//! [`backend::DirHandle`] implementations (an OS filesystem, a browser
//! directory, or this crate's own in-memory reference backend behind the
//! `mem-backend` feature), assembles a [`bindings::Bindings`] with
//! [`bindings::BindingsBuilder`], and dispatches decoded import calls to
//! the functions in [`snapshot1`].

pub mod backend;
pub mod bindings;
pub mod clock;
pub mod error;
pub mod exit;
#[cfg(feature = "mem-backend")]
pub mod mem_backend;
pub mod memory;
pub mod path;
pub mod random;
pub mod snapshot1;
pub mod stream;
pub mod strings;
pub mod table;
pub mod types;

pub use bindings::{Bindings, BindingsBuilder};
pub use error::{Errno, Result, WasiError};
pub use exit::ProcExit;
