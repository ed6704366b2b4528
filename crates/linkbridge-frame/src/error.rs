/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x4C42 \"LB\")")]
    InvalidMagic,

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The link produced no bytes within its read timeout.
    #[error("timed out waiting for frame bytes")]
    Timeout,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

/// Errors reported by a [`FramingEngine`](crate::FramingEngine).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// `begin()` has not been called, or `end()` already has.
    #[error("framing engine is not running")]
    NotRunning,

    /// No peer is currently reachable.
    #[error("peer not connected")]
    NotConnected,

    /// The outgoing queue stayed full for the whole send timeout.
    #[error("outgoing frame queue full")]
    QueueFull,

    /// The frame is larger than the engine or the peer accepts.
    #[error("frame too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The physical link reached end of stream.
    #[error("link closed")]
    LinkClosed,

    /// The physical link failed.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame codec error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
