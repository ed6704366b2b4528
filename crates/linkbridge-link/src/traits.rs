use std::io::{self, Read, Write};
use std::sync::Arc;

/// A full-duplex, blocking byte link.
///
/// Both directions are driven through a shared reference because a receive
/// worker and a send worker use the same link at the same time.
///
/// `read` may block for as long as the link's own timeout policy says. It
/// returns `Ok(0)` on end of stream; `TimedOut` and `WouldBlock` errors mean
/// "no bytes this time" and are not fatal.
pub trait ByteLink: Send + Sync {
    /// Read up to `buf.len()` bytes.
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write up to `buf.len()` bytes, returning how many were accepted.
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Flush any bytes buffered by the link.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    /// Link name for diagnostics.
    fn link_name(&self) -> &'static str;
}

impl<L: ByteLink + ?Sized> ByteLink for Arc<L> {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn flush(&self) -> io::Result<()> {
        (**self).flush()
    }

    fn link_name(&self) -> &'static str {
        (**self).link_name()
    }
}

impl<L: ByteLink + ?Sized> ByteLink for &L {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn flush(&self) -> io::Result<()> {
        (**self).flush()
    }

    fn link_name(&self) -> &'static str {
        (**self).link_name()
    }
}

impl<L: ByteLink + ?Sized> ByteLink for Box<L> {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn flush(&self) -> io::Result<()> {
        (**self).flush()
    }

    fn link_name(&self) -> &'static str {
        (**self).link_name()
    }
}

/// Exposes a [`ByteLink`] as `std::io::Read + Write`.
#[derive(Debug, Clone)]
pub struct LinkIo<L> {
    link: L,
}

impl<L: ByteLink> LinkIo<L> {
    pub fn new(link: L) -> Self {
        Self { link }
    }

    /// Borrow the wrapped link.
    pub fn get_ref(&self) -> &L {
        &self.link
    }

    /// Consume the adapter and return the link.
    pub fn into_inner(self) -> L {
        self.link
    }
}

impl<L: ByteLink> Read for LinkIo<L> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.link.read(buf)
    }
}

impl<L: ByteLink> Write for LinkIo<L> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.link.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.link.flush()
    }
}
