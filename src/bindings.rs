//! The top-level entry point (§3, §6, §7.3): wires together the file table,
//! preopens, stdio, argv/environ, the clock, and an optional cancellation
//! signal into the object a host hands its call dispatcher.

use crate::backend::DirHandle;
use crate::clock::{Clock, SystemClock};
use crate::stream::{EmptyInput, InputStream, OutputStream, TracingOutput};
use crate::strings::StringCollection;
use crate::table::FileTable;
use crate::types::Fd;
use tokio_util::sync::CancellationToken;

/// Everything a running guest instance needs from the host side of the
/// WASI boundary. One `Bindings` per guest instance.
pub struct Bindings {
    pub(crate) table: FileTable,
    pub(crate) args: StringCollection,
    pub(crate) env: StringCollection,
    pub(crate) stdin: Box<dyn InputStream>,
    pub(crate) stdout: Box<dyn OutputStream>,
    pub(crate) stderr: Box<dyn OutputStream>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) cancellation: CancellationToken,
}

impl Bindings {
    pub fn builder() -> BindingsBuilder {
        BindingsBuilder::default()
    }

    /// All preopened directories as `(fd, path)`, in registration order.
    /// Exposed so embedders can report what a guest can see without poking
    /// at the file table directly.
    pub fn preopens(&self) -> Vec<(Fd, String)> {
        self.table.preopen_entries()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

/// Builder for [`Bindings`]. Mirrors the configuration-object pattern
/// embedders use to assemble a WASI context piece by piece before
/// instantiation.
pub struct BindingsBuilder {
    program_name: String,
    args: Vec<String>,
    env: Vec<String>,
    preopens: Vec<(String, Box<dyn DirHandle>)>,
    stdin: Box<dyn InputStream>,
    stdout: Box<dyn OutputStream>,
    stderr: Box<dyn OutputStream>,
    clock: Box<dyn Clock>,
    cancellation: CancellationToken,
}

impl Default for BindingsBuilder {
    fn default() -> Self {
        BindingsBuilder {
            program_name: "wasi-module".to_string(),
            args: Vec::new(),
            env: Vec::new(),
            preopens: Vec::new(),
            stdin: Box::new(EmptyInput),
            stdout: Box::new(TracingOutput::stdout()),
            stderr: Box::new(TracingOutput::stderr()),
            clock: Box::new(SystemClock::new()),
            cancellation: CancellationToken::new(),
        }
    }
}

impl BindingsBuilder {
    /// Overrides the `argv[0]` convention (§3): the host always prepends a
    /// program name ahead of `args`/`arg`, defaulting to `"wasi-module"`.
    pub fn program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = name.into();
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I: IntoIterator<Item = S>, S: Into<String>>(mut self, args: I) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env_var(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env.push(format!("{}={}", key.as_ref(), value.as_ref()));
        self
    }

    /// Registers a preopened directory. Preopens are assigned descriptors in
    /// the order they're added, starting at 3 (§4.D.2).
    pub fn preopen(mut self, path: impl Into<String>, dir: Box<dyn DirHandle>) -> Self {
        self.preopens.push((path.into(), dir));
        self
    }

    pub fn stdin(mut self, stdin: Box<dyn InputStream>) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn stdout(mut self, stdout: Box<dyn OutputStream>) -> Self {
        self.stdout = stdout;
        self
    }

    pub fn stderr(mut self, stderr: Box<dyn OutputStream>) -> Self {
        self.stderr = stderr;
        self
    }

    pub fn clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn build(self) -> Bindings {
        let argv = std::iter::once(self.program_name).chain(self.args);
        Bindings {
            table: FileTable::new(self.preopens),
            args: StringCollection::new(argv),
            env: StringCollection::new(self.env),
            stdin: self.stdin,
            stdout: self.stdout,
            stderr: self.stderr,
            clock: self.clock,
            cancellation: self.cancellation,
        }
    }
}
