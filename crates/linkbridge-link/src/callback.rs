use std::fmt;
use std::io;

use crate::traits::ByteLink;

type ReadFn = dyn Fn(&mut [u8]) -> io::Result<usize> + Send + Sync;
type WriteFn = dyn Fn(&[u8]) -> io::Result<usize> + Send + Sync;

/// A link built from user supplied blocking read/write functions.
///
/// This is how a UART driver (or any other medium without a std stream type)
/// is plugged under a framing engine or a transport.
pub struct CallbackLink {
    read_fn: Box<ReadFn>,
    write_fn: Box<WriteFn>,
    name: &'static str,
}

impl CallbackLink {
    /// Create a link from a read function and a write function.
    pub fn new<R, W>(read_fn: R, write_fn: W) -> Self
    where
        R: Fn(&mut [u8]) -> io::Result<usize> + Send + Sync + 'static,
        W: Fn(&[u8]) -> io::Result<usize> + Send + Sync + 'static,
    {
        Self {
            read_fn: Box::new(read_fn),
            write_fn: Box::new(write_fn),
            name: "callback",
        }
    }

    /// Override the diagnostic name of this link.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl ByteLink for CallbackLink {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (self.read_fn)(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (self.write_fn)(buf)
    }

    fn link_name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for CallbackLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackLink")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
