use linkbridge_frame::{EngineError, FrameError};
use linkbridge_link::LinkError;

/// Outcomes a transport reports to the RPC layer.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Nothing happened within the bound. Also reported when an established
    /// connection drops, since RPC callers are only released on timeout.
    #[error("timed out")]
    Timeout,

    /// No connection has been established (or the transport is closed).
    #[error("connection closed")]
    ConnectionClosed,

    /// The framing engine rejected the outgoing frame.
    #[error("send failed: {0}")]
    SendFailed(#[source] EngineError),

    /// The framing engine failed to start.
    #[error("framing engine failed to start: {0}")]
    Engine(#[source] EngineError),

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Physical link error.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Frame codec error.
    #[error("frame error: {0}")]
    Frame(#[source] FrameError),
}

impl From<FrameError> for BridgeError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Timeout => Self::Timeout,
            FrameError::ConnectionClosed => Self::ConnectionClosed,
            other => Self::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
