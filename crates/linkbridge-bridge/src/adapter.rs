use std::sync::Arc;

use linkbridge_frame::{EngineError, FramingEngine};
use linkbridge_link::ByteLink;
use tracing::{debug, info, trace};

use crate::config::ConnectionCallback;
use crate::flags::{LinkStateFlags, StateBits};
use crate::queue::FrameQueue;

/// Binds a framing engine to one physical link and to the bridge's shared
/// queue and state bits.
pub struct FramingEngineAdapter {
    engine: Arc<dyn FramingEngine>,
    link: Arc<dyn ByteLink>,
}

impl FramingEngineAdapter {
    /// Register both engine callbacks.
    ///
    /// Received frames are pushed into `queue` followed by FRAME_PENDING.
    /// A frame larger than the free capacity panics: the engine was
    /// configured to accept frames the bridge cannot hold.
    pub fn new(
        engine: Arc<dyn FramingEngine>,
        link: Arc<dyn ByteLink>,
        queue: Arc<FrameQueue>,
        flags: Arc<LinkStateFlags>,
        on_connection_change: Option<ConnectionCallback>,
    ) -> Self {
        {
            let flags = Arc::clone(&flags);
            engine.set_frame_handler(Arc::new(move |address, payload| {
                let mut slots = queue.lock();
                if let Err(err) = slots.push(payload) {
                    panic!("framing engine delivered a frame the receive buffer cannot hold: {err}");
                }
                flags.set(StateBits::FRAME_PENDING);
                trace!(address, size = payload.len(), "frame queued");
            }));
        }

        engine.set_connection_handler(Arc::new(move |address, connected| {
            if connected {
                flags.update(StateBits::CONNECTED, StateBits::DISCONNECTED);
            } else {
                flags.update(StateBits::DISCONNECTED, StateBits::CONNECTED);
            }
            info!(address, connected, "link connection changed");
            if let Some(callback) = &on_connection_change {
                callback(connected);
            }
        }));

        Self { engine, link }
    }

    pub fn begin(&self) -> Result<(), EngineError> {
        debug!(link = self.link.link_name(), "starting framing engine");
        self.engine.begin()
    }

    pub fn end(&self) {
        self.engine.end();
        debug!(link = self.link.link_name(), "framing engine stopped");
    }

    /// One receive step against the physical link.
    pub fn drive_receive_once(&self) -> Result<usize, EngineError> {
        self.engine.run_rx(&*self.link)
    }

    /// One send step against the physical link. Returns bytes written.
    pub fn drive_send_once(&self) -> Result<usize, EngineError> {
        self.engine.run_tx(&*self.link)
    }

    pub fn send(&self, frame: &[u8]) -> Result<(), EngineError> {
        self.engine.write_frame(frame)
    }

    /// Hand `bytes` of consumed queue space back to the engine.
    pub fn release(&self, bytes: usize) {
        self.engine.release(bytes);
    }

    pub fn set_send_timeout(&self, timeout: Option<std::time::Duration>) {
        self.engine.set_send_timeout(timeout);
    }

    pub fn link_name(&self) -> &'static str {
        self.link.link_name()
    }
}
