//! Scriptable framing engine for unit tests.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use linkbridge_frame::{ConnectionHandler, EngineError, FrameHandler, FramingEngine, DATA};
use linkbridge_link::{ByteLink, CallbackLink};

/// A link that never carries anything.
pub(crate) fn null_link() -> CallbackLink {
    CallbackLink::new(
        |_buf: &mut [u8]| Err(io::Error::from(io::ErrorKind::TimedOut)),
        |buf: &[u8]| Ok(buf.len()),
    )
    .with_name("null")
}

#[derive(Default)]
pub(crate) struct MockEngine {
    frame_handler: Mutex<Option<FrameHandler>>,
    connection_handler: Mutex<Option<ConnectionHandler>>,
    inbound: Mutex<VecDeque<Vec<u8>>>,
    pub sent: Mutex<Vec<Vec<u8>>>,
    pub running: AtomicBool,
    pub reject_sends: AtomicBool,
    pub begins: AtomicUsize,
    pub ends: AtomicUsize,
    pub rx_steps: AtomicUsize,
    pub tx_steps: AtomicUsize,
    pub released: AtomicUsize,
}

impl MockEngine {
    /// Report a connection change as the engine would.
    pub fn connect(&self, connected: bool) {
        let handler = self.connection_handler.lock().unwrap().clone();
        if let Some(handler) = handler {
            handler(0, connected);
        }
    }

    /// Deliver a frame from the calling thread.
    pub fn emit(&self, payload: &[u8]) {
        let handler = self.frame_handler.lock().unwrap().clone();
        if let Some(handler) = handler {
            handler(DATA, payload);
        }
    }

    /// Deliver a frame from the next receive step.
    pub fn deliver_from_rx(&self, payload: &[u8]) {
        self.inbound.lock().unwrap().push_back(payload.to_vec());
    }
}

impl FramingEngine for MockEngine {
    fn begin(&self) -> Result<(), EngineError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn end(&self) {
        self.ends.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    fn run_rx(&self, link: &dyn ByteLink) -> Result<usize, EngineError> {
        self.rx_steps.fetch_add(1, Ordering::SeqCst);
        let next = self.inbound.lock().unwrap().pop_front();
        match next {
            Some(payload) => {
                self.emit(&payload);
                Ok(payload.len())
            }
            None => {
                // Stand in for a blocking read with a short timeout.
                let mut scratch = [0u8; 1];
                let _ = link.read(&mut scratch);
                thread::sleep(Duration::from_millis(1));
                Ok(0)
            }
        }
    }

    fn run_tx(&self, _link: &dyn ByteLink) -> Result<usize, EngineError> {
        self.tx_steps.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }

    fn write_frame(&self, payload: &[u8]) -> Result<(), EngineError> {
        if self.reject_sends.load(Ordering::SeqCst) {
            return Err(EngineError::QueueFull);
        }
        self.sent.lock().unwrap().push(payload.to_vec());
        Ok(())
    }

    fn set_send_timeout(&self, _timeout: Option<Duration>) {}

    fn release(&self, bytes: usize) {
        self.released.fetch_add(bytes, Ordering::SeqCst);
    }

    fn set_frame_handler(&self, handler: FrameHandler) {
        *self.frame_handler.lock().unwrap() = Some(handler);
    }

    fn set_connection_handler(&self, handler: ConnectionHandler) {
        *self.connection_handler.lock().unwrap() = Some(handler);
    }
}
