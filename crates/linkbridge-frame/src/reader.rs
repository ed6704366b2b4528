use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 1024;

/// Reads complete frames from any `Read` source.
///
/// Partial reads are buffered internally. A read timeout surfaces as
/// [`FrameError::Timeout`] and keeps the buffered bytes, so the next call
/// resumes the same frame.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.next_buffered()? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Err(FrameError::Timeout)
                }
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Decode a frame from already buffered bytes without touching the source.
    pub fn next_buffered(&mut self) -> Result<Option<Frame>> {
        match decode_frame(&mut self.buf, self.config.max_payload_size) {
            Ok(frame) => Ok(frame),
            Err(err) => {
                // The stream is out of sync; nothing buffered can be trusted.
                self.buf.clear();
                Err(err)
            }
        }
    }

    /// Number of bytes buffered but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Feed bytes obtained elsewhere into the decode buffer.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Drop buffered bytes.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::{encode_frame, MAGIC};

    fn wire(frames: &[(u16, &str)]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (channel, payload) in frames {
            encode_frame(*channel, payload.as_bytes(), &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn reads_frames_in_order() {
        let bytes = wire(&[(1, "one"), (1, "two"), (0, "three")]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"one");
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"two");
        let third = reader.read_frame().unwrap();
        assert_eq!((third.channel, third.payload.as_ref()), (0, b"three".as_ref()));
    }

    #[test]
    fn byte_at_a_time_source() {
        let mut reader = FrameReader::new(Trickle {
            bytes: wire(&[(1, "slow")]),
            pos: 0,
        });
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"slow");
    }

    #[test]
    fn eof_is_connection_closed() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));

        let mut partial = BytesMut::new();
        partial.put_slice(&MAGIC);
        partial.put_u32_le(16);
        partial.put_u16_le(1);
        partial.put_slice(b"short");
        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn timeout_keeps_partial_frame() {
        let bytes = wire(&[(1, "resume")]);
        let (head, tail) = bytes.split_at(5);
        let mut reader = FrameReader::new(Scripted {
            steps: vec![
                Step::Data(head.to_vec()),
                Step::Err(ErrorKind::TimedOut),
                Step::Data(tail.to_vec()),
            ],
        });

        assert!(matches!(reader.read_frame(), Err(FrameError::Timeout)));
        assert_eq!(reader.buffered(), 5);
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"resume");
    }

    #[test]
    fn interrupted_is_retried() {
        let mut reader = FrameReader::new(Scripted {
            steps: vec![Step::Err(ErrorKind::Interrupted), Step::Data(wire(&[(1, "ok")]))],
        });
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"ok");
    }

    #[test]
    fn corrupt_stream_clears_buffer() {
        let mut reader = FrameReader::new(Cursor::new(vec![0u8; 12]));
        assert!(matches!(reader.read_frame(), Err(FrameError::InvalidMagic)));
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn oversize_rejected_by_config() {
        let cfg = FrameConfig {
            max_payload_size: 4,
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire(&[(1, "too long")])), cfg);
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::PayloadTooLarge { size: 8, max: 4 })
        ));
    }

    #[test]
    fn pushed_bytes_decode_without_reading() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        reader.push_bytes(&wire(&[(1, "fed")]));
        let frame = reader.next_buffered().unwrap().unwrap();
        assert_eq!(frame.payload.as_ref(), b"fed");
        assert!(reader.next_buffered().unwrap().is_none());
    }

    struct Trickle {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    enum Step {
        Data(Vec<u8>),
        Err(ErrorKind),
    }

    struct Scripted {
        steps: Vec<Step>,
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.steps.is_empty() {
                return Ok(0);
            }
            match self.steps.remove(0) {
                Step::Data(data) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                Step::Err(kind) => Err(std::io::Error::from(kind)),
            }
        }
    }
}
