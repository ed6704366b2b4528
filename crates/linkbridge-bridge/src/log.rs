use std::collections::VecDeque;
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use linkbridge_frame::{decode_frame, encode_to_bytes, DATA, DEFAULT_MAX_PAYLOAD};
use linkbridge_link::{ByteLink, LinkError};
use tracing::info;

use crate::error::{BridgeError, Result};
use crate::transport::Transport;

/// Tracing target outgoing frames are logged under.
pub const LOG_TARGET: &str = "linkbridge::rpc";
/// Default bound for the bytes following the first byte of a frame.
pub const DEFAULT_RX_TIMEOUT: Duration = Duration::from_millis(500);

const READ_CHUNK_SIZE: usize = 256;

/// Writes outgoing frames to the log instead of a link.
///
/// Each frame is encoded and logged at info level as `[<hex>]`. Incoming
/// frames are read from `link`: waiting for the first byte is unbounded,
/// the remainder of the frame must arrive within `rx_timeout`.
pub struct LogTransport<L> {
    link: L,
    rx_timeout: Duration,
    max_payload: usize,
    // Lock order: rx_buf, then ready. `ready` is never held across a read.
    rx_buf: Mutex<BytesMut>,
    ready: Mutex<VecDeque<Bytes>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lowercase hex of `bytes` wrapped in brackets.
pub fn hex_frame(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 2);
    out.push('[');
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out.push(']');
    out
}

impl<L: ByteLink> LogTransport<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            rx_timeout: DEFAULT_RX_TIMEOUT,
            max_payload: DEFAULT_MAX_PAYLOAD,
            rx_buf: Mutex::new(BytesMut::new()),
            ready: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_rx_timeout(mut self, timeout: Duration) -> Self {
        self.rx_timeout = timeout;
        self
    }

    pub fn with_max_payload(mut self, max: usize) -> Self {
        self.max_payload = max;
        self
    }
}

impl<L: ByteLink> Transport for LogTransport<L> {
    fn send(&self, frame: &[u8]) -> Result<()> {
        let wire = encode_to_bytes(DATA, frame)?;
        info!(target: LOG_TARGET, "{}", hex_frame(&wire));
        Ok(())
    }

    fn receive(&self) -> Result<Bytes> {
        if let Some(frame) = lock(&self.ready).pop_front() {
            return Ok(frame);
        }
        let mut buf = lock(&self.rx_buf);
        if let Some(frame) = lock(&self.ready).pop_front() {
            return Ok(frame);
        }
        let mut deadline = (!buf.is_empty()).then(|| Instant::now() + self.rx_timeout);
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            match decode_frame(&mut buf, self.max_payload) {
                Ok(Some(frame)) => return Ok(frame.payload),
                Ok(None) => {}
                Err(err) => {
                    buf.clear();
                    return Err(err.into());
                }
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                buf.clear();
                return Err(BridgeError::Timeout);
            }

            match self.link.read(&mut chunk) {
                Ok(0) => return Err(BridgeError::ConnectionClosed),
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    deadline.get_or_insert_with(|| Instant::now() + self.rx_timeout);
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) => {}
                Err(err) => return Err(BridgeError::Link(LinkError::Io(err))),
            }
        }
    }

    /// True once a whole frame has been read. Never waits for a `receive`
    /// that is reading the link.
    fn has_message(&self) -> bool {
        let mut buf = match self.rx_buf.try_lock() {
            Ok(buf) => buf,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return !lock(&self.ready).is_empty(),
        };
        let mut ready = lock(&self.ready);
        while let Ok(Some(frame)) = decode_frame(&mut buf, self.max_payload) {
            ready.push_back(frame.payload);
        }
        !ready.is_empty()
    }
}

impl<L> std::fmt::Debug for LogTransport<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogTransport")
            .field("rx_timeout", &self.rx_timeout)
            .field("max_payload", &self.max_payload)
            .finish_non_exhaustive()
    }
}
