use std::any::Any;
use std::panic;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use linkbridge_frame::FramingEngine;
use linkbridge_link::ByteLink;
use tracing::{debug, error, info};

use crate::adapter::FramingEngineAdapter;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::flags::{LinkStateFlags, StateBits};
use crate::queue::FrameQueue;
use crate::worker;

const LOOPS_DONE: StateBits = StateBits::RX_LOOP_DONE.union(StateBits::TX_LOOP_DONE);

type PanicPayload = Box<dyn Any + Send + 'static>;

/// Blocking frame API over a framing engine that drives a byte link.
///
/// `open` starts the engine and two worker threads that pump it against the
/// link; `close` stops them. Received frames are buffered in a queue bounded
/// by `buffer_capacity` bytes until `receive` takes them.
///
/// The link's `read` must return within a bounded time (a read timeout, or
/// `TimedOut` from a callback) so `close` can stop the receive worker.
pub struct TransportBridge {
    config: BridgeConfig,
    flags: Arc<LinkStateFlags>,
    queue: Arc<FrameQueue>,
    adapter: Arc<FramingEngineAdapter>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TransportBridge {
    /// Bind `engine` to `link`. The bridge starts closed.
    pub fn new<L, E>(link: L, engine: E, config: BridgeConfig) -> Self
    where
        L: ByteLink + 'static,
        E: FramingEngine + 'static,
    {
        let flags = Arc::new(LinkStateFlags::new(StateBits::CLOSED | LOOPS_DONE));
        let queue = Arc::new(FrameQueue::new(config.buffer_capacity));
        let adapter = FramingEngineAdapter::new(
            Arc::new(engine),
            Arc::new(link),
            Arc::clone(&queue),
            Arc::clone(&flags),
            config.on_connection_change.clone(),
        );
        adapter.set_send_timeout(config.send_timeout);

        Self {
            config,
            flags,
            queue,
            adapter: Arc::new(adapter),
            workers: Mutex::new(Vec::new()),
        }
    }

    fn workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the framing engine and both worker loops.
    ///
    /// The bridge is open and disconnected afterwards.
    ///
    /// # Panics
    ///
    /// Panics if the bridge is already open.
    pub fn open(&self) -> Result<()> {
        let mut workers = self.workers();
        assert!(
            !self.flags.contains(StateBits::OPENED),
            "open() called on a transport bridge that is already open"
        );

        self.flags.clear(
            StateBits::CLOSED
                | LOOPS_DONE
                | StateBits::CONNECTED
                | StateBits::DISCONNECTED
                | StateBits::FRAME_PENDING,
        );
        self.queue.reset();
        self.flags.set(StateBits::OPENED);

        if let Err(err) = self.adapter.begin() {
            self.flags.update(StateBits::CLOSED | LOOPS_DONE, StateBits::OPENED);
            return Err(BridgeError::Engine(err));
        }

        match worker::spawn_rx(
            Arc::clone(&self.adapter),
            Arc::clone(&self.flags),
            self.config.rx_priority,
        ) {
            Ok(handle) => workers.push(handle),
            Err(err) => {
                self.flags.set(LOOPS_DONE);
                let _ = self.shutdown(&mut workers);
                return Err(BridgeError::Spawn(err));
            }
        }
        match worker::spawn_tx(
            Arc::clone(&self.adapter),
            Arc::clone(&self.flags),
            self.config.tx_priority,
        ) {
            Ok(handle) => workers.push(handle),
            Err(err) => {
                self.flags.set(StateBits::TX_LOOP_DONE);
                if self.shutdown(&mut workers).is_some() {
                    error!("receive loop panicked while the bridge was opening");
                }
                return Err(BridgeError::Spawn(err));
            }
        }

        info!(
            link = self.adapter.link_name(),
            capacity = self.queue.capacity(),
            "transport bridge opened"
        );
        Ok(())
    }

    /// Stop both worker loops, then the framing engine.
    ///
    /// Blocks until both loops have exited. Pending `receive` and
    /// `wait_connected` calls are released.
    ///
    /// # Panics
    ///
    /// Panics if the bridge is not open. If a worker loop panicked (for
    /// example on a frame the receive buffer could not hold), the bridge is
    /// closed and that panic is resumed on the caller.
    pub fn close(&self) {
        let mut workers = self.workers();
        assert!(
            self.flags.contains(StateBits::OPENED),
            "close() called on a transport bridge that is not open"
        );
        let panicked = self.shutdown(&mut workers);
        drop(workers);
        info!(link = self.adapter.link_name(), "transport bridge closed");
        if let Some(payload) = panicked {
            panic::resume_unwind(payload);
        }
    }

    /// Stop and join both loops. Returns the first worker panic, if any.
    fn shutdown(&self, workers: &mut Vec<JoinHandle<()>>) -> Option<PanicPayload> {
        self.flags.update(StateBits::CLOSED, StateBits::OPENED);
        self.flags.wait_all(LOOPS_DONE, None);
        let mut panicked = None;
        for handle in workers.drain(..) {
            if let Err(payload) = handle.join() {
                panicked.get_or_insert(payload);
            }
        }
        self.adapter.end();
        panicked
    }

    /// Wait for the peer using the configured connect timeout.
    pub fn wait_connected(&self) -> Result<()> {
        self.wait_connected_for(self.config.connect_timeout)
    }

    /// Wait for the peer; `None` waits forever.
    ///
    /// Returns immediately once connected. Fails with `ConnectionClosed` if
    /// the bridge is closed first.
    pub fn wait_connected_for(&self, timeout: Option<Duration>) -> Result<()> {
        let fired = self
            .flags
            .wait_any(StateBits::CONNECTED | StateBits::CLOSED, timeout);
        if fired.contains(StateBits::CLOSED) {
            Err(BridgeError::ConnectionClosed)
        } else if fired.contains(StateBits::CONNECTED) {
            Ok(())
        } else {
            Err(BridgeError::Timeout)
        }
    }

    /// Hand one frame to the framing engine.
    ///
    /// Blocks only as long as the engine applies backpressure.
    pub fn send(&self, frame: &[u8]) -> Result<()> {
        self.adapter.send(frame).map_err(|err| {
            debug!(error = %err, size = frame.len(), "send rejected by framing engine");
            BridgeError::SendFailed(err)
        })
    }

    /// Take the next received frame, waiting up to the receive timeout.
    ///
    /// - never connected: `ConnectionClosed` without waiting
    /// - connection dropped, or the bridge closes while waiting: the queue
    ///   is discarded and `Timeout` is returned
    pub fn receive(&self) -> Result<Bytes> {
        let state = self.flags.get();
        if !state.contains(StateBits::CONNECTED) {
            self.queue.reset();
            let dropped =
                state.contains(StateBits::DISCONNECTED) && !state.contains(StateBits::CLOSED);
            return Err(if dropped {
                BridgeError::Timeout
            } else {
                BridgeError::ConnectionClosed
            });
        }

        // Frames may already be queued with FRAME_PENDING consumed by an
        // earlier call; look before waiting.
        if let Some(frame) = self.take_frame() {
            return Ok(frame);
        }

        let fired = self.flags.wait_any(
            StateBits::FRAME_PENDING | StateBits::DISCONNECTED | StateBits::CLOSED,
            self.config.receive_timeout,
        );

        if fired.contains(StateBits::FRAME_PENDING) {
            // A concurrent caller may have drained it already.
            if let Some(frame) = self.take_frame() {
                return Ok(frame);
            }
        }

        if fired.intersects(StateBits::DISCONNECTED | StateBits::CLOSED) {
            debug!(state = ?fired, "link lost while receiving");
            self.queue.reset();
        }
        Err(BridgeError::Timeout)
    }

    /// Pop one frame and bring FRAME_PENDING in line with what is left.
    /// The freed space is handed back to the engine.
    fn take_frame(&self) -> Option<Bytes> {
        let frame = {
            let mut queue = self.queue.lock();
            let frame = queue.pop();
            if queue.is_empty() {
                self.flags.clear(StateBits::FRAME_PENDING);
            } else {
                self.flags.set(StateBits::FRAME_PENDING);
            }
            frame
        };
        if let Some(frame) = &frame {
            self.adapter.release(frame.len());
        }
        frame
    }

    /// True if a received frame is waiting. Never blocks on the link.
    pub fn has_message(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Bytes received but not yet taken by `receive`.
    pub fn queued_bytes(&self) -> usize {
        self.queue.used_bytes()
    }

    pub fn is_open(&self) -> bool {
        self.flags.contains(StateBits::OPENED)
    }

    pub fn is_connected(&self) -> bool {
        self.flags.contains(StateBits::CONNECTED)
    }

    /// Current state bits.
    pub fn state(&self) -> StateBits {
        self.flags.get()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl Drop for TransportBridge {
    fn drop(&mut self) {
        if !self.is_open() {
            return;
        }
        if thread::panicking() {
            // A second panic here would abort.
            let mut workers = self.workers();
            if self.shutdown(&mut workers).is_some() {
                error!("worker loop panicked; bridge dropped during unwind");
            }
        } else {
            self.close();
        }
    }
}

impl std::fmt::Debug for TransportBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportBridge")
            .field("link", &self.adapter.link_name())
            .field("state", &self.flags.get())
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}
