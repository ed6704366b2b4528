//! Blocking frame transports for RPC.
//!
//! The core is [`TransportBridge`]: it owns a [`FramingEngine`] bound to a
//! byte link, pumps it from two worker threads and exposes
//! `open`/`close`/`wait_connected`/`send`/`receive`/`has_message` with
//! explicit timeouts. [`GenericTransport`] and [`LogTransport`] are simpler
//! [`Transport`] variants without a framing engine.
//!
//! [`FramingEngine`]: linkbridge_frame::FramingEngine

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod error;
pub mod flags;
pub mod generic;
pub mod log;
pub mod queue;
pub mod transport;
mod worker;

#[cfg(test)]
mod mock;

pub use adapter::FramingEngineAdapter;
pub use bridge::TransportBridge;
pub use config::{BridgeConfig, ConnectionCallback};
pub use error::{BridgeError, Result};
pub use flags::{LinkStateFlags, StateBits};
pub use generic::GenericTransport;
pub use log::LogTransport;
pub use queue::{FrameQueue, QueueError};
pub use transport::Transport;
