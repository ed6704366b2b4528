//! The framing engine capability.
//!
//! A framing engine turns a raw byte link into whole frames. It is pumped
//! from the outside: one worker repeatedly calls [`FramingEngine::run_rx`]
//! with the link's read side, another repeatedly calls
//! [`FramingEngine::run_tx`] with its write side. Results come back through
//! the two registered handlers, which may run on either worker thread.

use std::sync::Arc;
use std::time::Duration;

use linkbridge_link::ByteLink;

use crate::error::EngineError;

/// Invoked with `(channel, payload)` for every frame received from the peer.
pub type FrameHandler = Arc<dyn Fn(u16, &[u8]) + Send + Sync>;

/// Invoked with `(address, connected)` when the peer becomes reachable or
/// unreachable.
pub type ConnectionHandler = Arc<dyn Fn(u16, bool) + Send + Sync>;

pub trait FramingEngine: Send + Sync {
    /// Start processing. Handlers should be registered before this.
    fn begin(&self) -> Result<(), EngineError>;

    /// Stop processing and drop any queued output.
    fn end(&self);

    /// Perform one receive step: read once from `link` and dispatch every
    /// complete frame. Returns the number of bytes consumed.
    fn run_rx(&self, link: &dyn ByteLink) -> Result<usize, EngineError>;

    /// Perform one send step. Returns the number of bytes written; zero means
    /// nothing was pending.
    fn run_tx(&self, link: &dyn ByteLink) -> Result<usize, EngineError>;

    /// Queue one frame for transmission.
    fn write_frame(&self, payload: &[u8]) -> Result<(), EngineError>;

    /// How long `write_frame` may wait for room in the outgoing queue.
    /// `None` waits forever.
    fn set_send_timeout(&self, timeout: Option<Duration>);

    /// Report that the consumer has taken `bytes` of delivered payload out
    /// of its receive buffer. Engines with receive flow control hand that
    /// space back to the peer; the default does nothing.
    fn release(&self, _bytes: usize) {}

    fn set_frame_handler(&self, handler: FrameHandler);

    fn set_connection_handler(&self, handler: ConnectionHandler);
}

impl<E: FramingEngine + ?Sized> FramingEngine for Arc<E> {
    fn begin(&self) -> Result<(), EngineError> {
        (**self).begin()
    }

    fn end(&self) {
        (**self).end()
    }

    fn run_rx(&self, link: &dyn ByteLink) -> Result<usize, EngineError> {
        (**self).run_rx(link)
    }

    fn run_tx(&self, link: &dyn ByteLink) -> Result<usize, EngineError> {
        (**self).run_tx(link)
    }

    fn write_frame(&self, payload: &[u8]) -> Result<(), EngineError> {
        (**self).write_frame(payload)
    }

    fn set_send_timeout(&self, timeout: Option<Duration>) {
        (**self).set_send_timeout(timeout)
    }

    fn release(&self, bytes: usize) {
        (**self).release(bytes)
    }

    fn set_frame_handler(&self, handler: FrameHandler) {
        (**self).set_frame_handler(handler)
    }

    fn set_connection_handler(&self, handler: ConnectionHandler) {
        (**self).set_connection_handler(handler)
    }
}
