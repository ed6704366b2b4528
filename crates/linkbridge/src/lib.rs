//! Blocking, framed RPC transports over byte links.
//!
//! # Crate Structure
//!
//! - [`link`]: physical byte links (callbacks, Unix sockets)
//! - [`frame`]: wire framing and the pumped framing engine
//! - [`bridge`]: transport bridge, worker loops and the RPC-facing transports

/// Re-export link types.
pub mod link {
    pub use linkbridge_link::*;
}

/// Re-export frame types.
pub mod frame {
    pub use linkbridge_frame::*;
}

/// Re-export bridge types.
pub mod bridge {
    pub use linkbridge_bridge::*;
}
