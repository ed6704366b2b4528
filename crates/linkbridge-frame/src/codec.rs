use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: magic (2) + length (4) + channel (2) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Magic bytes: "LB" (0x4C 0x42).
pub const MAGIC: [u8; 2] = [0x4C, 0x42];

/// Default maximum payload size: 64 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// A payload tagged with the channel it travels on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Channel (peer address) of this frame.
    pub channel: u16,
    /// The frame payload.
    pub payload: Bytes,
}

impl Frame {
    pub fn new(channel: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }

    /// Header plus payload size on the wire.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Append one encoded frame to `dst`.
///
/// ```text
/// ┌────────────┬────────────┬────────────┬──────────────────┐
/// │ Magic (2B) │ Length     │ Channel    │ Payload          │
/// │ "LB"       │ (4B LE)    │ (2B LE)    │ (Length bytes)   │
/// └────────────┴────────────┴────────────┴──────────────────┘
/// ```
pub fn encode_frame(channel: u16, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(len);
    dst.put_u16_le(channel);
    dst.put_slice(payload);
    Ok(())
}

/// Encode a single frame into a fresh buffer.
pub fn encode_to_bytes(channel: u16, payload: &[u8]) -> Result<Bytes> {
    let mut dst = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    encode_frame(channel, payload, &mut dst)?;
    Ok(dst.freeze())
}

/// Take one complete frame off the front of `src`.
///
/// Returns `Ok(None)` until the whole frame has been buffered. Header
/// problems are reported as soon as the header is complete, before the
/// payload arrives.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[..2] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }

    let mut header = &src[2..HEADER_SIZE];
    let payload_len = header.get_u32_le() as usize;
    let channel = header.get_u16_le();

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    if src.len() < HEADER_SIZE + payload_len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();
    Ok(Some(Frame { channel, payload }))
}

/// Limits and timeouts for [`FrameReader`](crate::FrameReader) and
/// [`FrameWriter`](crate::FrameWriter).
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 64 KiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
