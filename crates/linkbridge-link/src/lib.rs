//! Blocking byte-level physical link abstraction.
//!
//! A physical link is anything that can move raw bytes in both directions:
//! - user supplied read/write functions (UART drivers, test harnesses)
//! - Unix domain sockets (Linux/macOS)
//!
//! This is the lowest layer of linkbridge. Framing engines and transports
//! drive a link only through the [`ByteLink`] trait defined here.

pub mod callback;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod stream;
#[cfg(unix)]
pub mod uds;

pub use callback::CallbackLink;
pub use error::{LinkError, Result};
pub use traits::{ByteLink, LinkIo};

#[cfg(unix)]
pub use stream::LinkStream;
#[cfg(unix)]
pub use uds::UnixDomainSocket;
