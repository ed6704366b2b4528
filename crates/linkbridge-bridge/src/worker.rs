//! RX and TX pump loops.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, debug_span, error};

use crate::adapter::FramingEngineAdapter;
use crate::flags::{LinkStateFlags, StateBits};

/// Idle sleep of the TX loop when nothing was sent.
pub const TICK: Duration = Duration::from_millis(1);
/// Pause after a failed receive step so a dead link does not spin.
pub const RX_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Sets the loop's DONE bit when the loop exits.
///
/// A loop that unwinds can no longer move frames, so the link is also
/// marked disconnected, releasing `receive` and `wait_connected` callers.
struct DoneGuard<'a> {
    flags: &'a LinkStateFlags,
    bit: StateBits,
}

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(loop_done = ?self.bit, "worker loop panicked; link marked disconnected");
            self.flags
                .update(self.bit | StateBits::DISCONNECTED, StateBits::CONNECTED);
        } else {
            self.flags.set(self.bit);
        }
    }
}

pub(crate) fn spawn_rx(
    adapter: Arc<FramingEngineAdapter>,
    flags: Arc<LinkStateFlags>,
    priority: u8,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("linkbridge-rx".to_string())
        .spawn(move || rx_loop(&adapter, &flags, priority))
}

pub(crate) fn spawn_tx(
    adapter: Arc<FramingEngineAdapter>,
    flags: Arc<LinkStateFlags>,
    priority: u8,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("linkbridge-tx".to_string())
        .spawn(move || tx_loop(&adapter, &flags, priority))
}

fn rx_loop(adapter: &FramingEngineAdapter, flags: &LinkStateFlags, priority: u8) {
    let _done = DoneGuard {
        flags,
        bit: StateBits::RX_LOOP_DONE,
    };
    let span = debug_span!("rx_loop", link = adapter.link_name(), priority);
    let _enter = span.enter();
    debug!("receive loop started");

    while flags.contains(StateBits::OPENED) {
        // The link read blocks for us; no extra delay on success.
        if let Err(err) = adapter.drive_receive_once() {
            debug!(error = %err, "receive step failed");
            thread::sleep(RX_ERROR_BACKOFF);
        }
    }
    debug!("receive loop stopped");
}

fn tx_loop(adapter: &FramingEngineAdapter, flags: &LinkStateFlags, priority: u8) {
    let _done = DoneGuard {
        flags,
        bit: StateBits::TX_LOOP_DONE,
    };
    let span = debug_span!("tx_loop", link = adapter.link_name(), priority);
    let _enter = span.enter();
    debug!("send loop started");

    while flags.contains(StateBits::OPENED) {
        match adapter.drive_send_once() {
            Ok(0) => thread::sleep(TICK),
            Ok(_) => {}
            Err(err) => {
                debug!(error = %err, "send step failed");
                thread::sleep(TICK);
            }
        }
    }
    debug!("send loop stopped");
}
