use bytes::Bytes;

use crate::bridge::TransportBridge;
use crate::error::Result;

/// What an RPC client or server needs from the wire: whole frames in both
/// directions.
///
/// Implementations are chosen at construction: [`TransportBridge`] for a
/// framing engine, [`GenericTransport`](crate::GenericTransport) for plain
/// length-prefixed frames, [`LogTransport`](crate::LogTransport) for a log
/// sink.
pub trait Transport: Send + Sync {
    /// Send one frame.
    fn send(&self, frame: &[u8]) -> Result<()>;

    /// Receive one frame, blocking within the transport's own timeout.
    fn receive(&self) -> Result<Bytes>;

    /// True if `receive` has something to return without waiting for the
    /// link.
    fn has_message(&self) -> bool;
}

impl Transport for TransportBridge {
    fn send(&self, frame: &[u8]) -> Result<()> {
        TransportBridge::send(self, frame)
    }

    fn receive(&self) -> Result<Bytes> {
        TransportBridge::receive(self)
    }

    fn has_message(&self) -> bool {
        TransportBridge::has_message(self)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, frame: &[u8]) -> Result<()> {
        (**self).send(frame)
    }

    fn receive(&self) -> Result<Bytes> {
        (**self).receive()
    }

    fn has_message(&self) -> bool {
        (**self).has_message()
    }
}
