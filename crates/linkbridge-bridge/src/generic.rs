use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use bytes::Bytes;
use linkbridge_frame::{FrameConfig, FrameReader, FrameWriter, DATA};
use linkbridge_link::{ByteLink, LinkIo};
use tracing::{debug, trace};

use crate::error::Result;
use crate::transport::Transport;

/// Length-prefixed frames directly over a byte link, with no framing
/// engine and no worker threads.
///
/// Every call runs on the caller's thread. `receive` blocks as long as the
/// link's read does; a link read timeout surfaces as `Timeout`.
/// `has_message` never waits for a read in progress.
pub struct GenericTransport<L> {
    // Lock order: reader, then ready. `ready` is never held across I/O.
    reader: Mutex<FrameReader<LinkIo<Arc<L>>>>,
    ready: Mutex<VecDeque<Bytes>>,
    tx: Mutex<FrameWriter<LinkIo<Arc<L>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<L: ByteLink> GenericTransport<L> {
    pub fn new(link: L) -> Self {
        Self::with_config(link, FrameConfig::default())
    }

    pub fn with_config(link: L, config: FrameConfig) -> Self {
        let link = Arc::new(link);
        Self {
            reader: Mutex::new(FrameReader::with_config(
                LinkIo::new(Arc::clone(&link)),
                config.clone(),
            )),
            ready: Mutex::new(VecDeque::new()),
            tx: Mutex::new(FrameWriter::with_config(LinkIo::new(link), config)),
        }
    }
}

impl<L: ByteLink> Transport for GenericTransport<L> {
    fn send(&self, frame: &[u8]) -> Result<()> {
        lock(&self.tx).send(DATA, frame)?;
        trace!(size = frame.len(), "frame sent");
        Ok(())
    }

    fn receive(&self) -> Result<Bytes> {
        if let Some(frame) = lock(&self.ready).pop_front() {
            return Ok(frame);
        }
        let mut reader = lock(&self.reader);
        // `has_message` may have decoded a frame while we waited for the reader.
        if let Some(frame) = lock(&self.ready).pop_front() {
            return Ok(frame);
        }
        loop {
            let frame = reader.read_frame()?;
            if frame.channel == DATA {
                return Ok(frame.payload);
            }
            debug!(channel = frame.channel, "ignoring frame on foreign channel");
        }
    }

    fn has_message(&self) -> bool {
        let mut reader = match self.reader.try_lock() {
            Ok(reader) => reader,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            // A receive is reading; only already decoded frames count.
            Err(TryLockError::WouldBlock) => return !lock(&self.ready).is_empty(),
        };
        let mut ready = lock(&self.ready);
        while let Ok(Some(frame)) = reader.next_buffered() {
            if frame.channel == DATA {
                ready.push_back(frame.payload);
            }
        }
        !ready.is_empty()
    }
}

impl<L> std::fmt::Debug for GenericTransport<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericTransport").finish_non_exhaustive()
    }
}
