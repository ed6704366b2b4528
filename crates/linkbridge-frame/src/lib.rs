//! Framing for linkbridge byte links.
//!
//! Every frame on the wire carries:
//! - A 2-byte magic number ("LB") for stream synchronization
//! - A 4-byte little-endian payload length
//! - A 2-byte little-endian channel ID, which doubles as the peer address
//!
//! [`FrameReader`] and [`FrameWriter`] move whole frames over any blocking
//! `Read`/`Write`. [`StreamFramer`] is the pumped [`FramingEngine`] the
//! transport bridge drives: it adds a hello handshake so each side knows
//! when its peer is reachable.

pub mod channel;
pub mod codec;
pub mod control;
pub mod engine;
pub mod error;
pub mod framer;
pub mod reader;
pub mod writer;

pub use channel::{channel_name, CONTROL, DATA, USER_CHANNEL_START};
pub use codec::{
    decode_frame, encode_frame, encode_to_bytes, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD,
    HEADER_SIZE, MAGIC,
};
pub use control::{ControlMessage, CONTROL_CREDIT, CONTROL_HELLO, CONTROL_HELLO_ACK};
pub use engine::{ConnectionHandler, FrameHandler, FramingEngine};
pub use error::{EngineError, FrameError, Result};
pub use framer::{FramerConfig, StreamFramer};
pub use reader::FrameReader;
pub use writer::FrameWriter;
