use std::ops::ControlFlow;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use linkbridge_bridge::{BridgeConfig, BridgeError, TransportBridge};
use linkbridge_frame::{FramerConfig, StreamFramer};
use linkbridge_link::{LinkStream, UnixDomainSocket};
use tracing::{info, warn};

use crate::cmd::LinkArgs;
use crate::exit::{bridge_error, link_error, CliError, CliResult, INTERNAL, TIMEOUT};
use crate::output::{print_event, Event, OutputFormat, PeerSummary};

/// Socket read timeout; bounds how long closing waits for the receive loop.
const LINK_POLL: Duration = Duration::from_millis(50);
/// Receive timeout used by the serving loops between shutdown checks.
pub const RECEIVE_POLL: Duration = Duration::from_millis(250);
const CONNECT_RETRY: Duration = Duration::from_millis(25);
/// Pause between accept attempts while no peer is queued.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// One bridged peer connection.
pub struct Session {
    pub bridge: TransportBridge,
    pub peer: String,
    engine: Arc<StreamFramer>,
}

impl Session {
    pub fn open(
        stream: LinkStream,
        link: &LinkArgs,
        peer: String,
        receive_timeout: Duration,
    ) -> CliResult<Self> {
        stream
            .set_read_timeout(Some(LINK_POLL))
            .map_err(|err| link_error("socket setup failed", err))?;

        let engine = Arc::new(StreamFramer::new(FramerConfig {
            max_frame_size: link.mtu,
            rx_window: link.capacity,
            ..FramerConfig::default()
        }));
        let config = BridgeConfig::default()
            .with_buffer_capacity(link.capacity)
            .with_receive_timeout(Some(receive_timeout));
        let bridge = TransportBridge::new(stream, Arc::clone(&engine), config);
        bridge
            .open()
            .map_err(|err| bridge_error("bridge open failed", err))?;

        Ok(Self {
            bridge,
            peer,
            engine,
        })
    }

    /// Wait until every queued frame is on the wire. Returns false if
    /// `timeout` elapsed first.
    pub fn flush(&self, timeout: Duration) -> bool {
        let started = Instant::now();
        while !self.engine.is_idle() {
            if started.elapsed() >= timeout || !self.bridge.is_connected() {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

/// Connect to `path`, retrying until it accepts or `timeout` elapses.
pub fn connect_with_retry(path: &Path, timeout: Duration) -> CliResult<LinkStream> {
    let started = Instant::now();
    loop {
        match UnixDomainSocket::connect(path) {
            Ok(stream) => return Ok(stream),
            Err(err) if started.elapsed() >= timeout => {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("connect failed after {timeout:?}: {err}"),
                ));
            }
            Err(_) => thread::sleep(CONNECT_RETRY),
        }
    }
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Accept peers on `path` one at a time and hand every received frame to
/// `on_frame` until it breaks or `running` clears. Link events are printed
/// in `format`; the returned summaries hold one entry per accepted peer.
///
/// Accepting polls, so clearing `running` stops an idle server within
/// [`ACCEPT_POLL`].
pub fn serve<F>(
    path: &Path,
    link: &LinkArgs,
    handshake_timeout: Duration,
    running: &AtomicBool,
    format: OutputFormat,
    mut on_frame: F,
) -> CliResult<Vec<PeerSummary>>
where
    F: FnMut(&Session, Bytes) -> CliResult<ControlFlow<()>>,
{
    let socket = UnixDomainSocket::bind(path).map_err(|err| link_error("bind failed", err))?;
    socket
        .set_nonblocking(true)
        .map_err(|err| link_error("socket setup failed", err))?;
    info!(path = %socket.path().display(), "listening");

    let mut peers = Vec::new();
    while running.load(Ordering::SeqCst) {
        let Some(stream) = socket
            .try_accept()
            .map_err(|err| link_error("accept failed", err))?
        else {
            thread::sleep(ACCEPT_POLL);
            continue;
        };
        let index = peers.len();
        let session = Session::open(stream, link, format!("peer-{}", index + 1), RECEIVE_POLL)?;
        peers.push(PeerSummary::new(&session.peer));
        let summary = &mut peers[index];

        match session.bridge.wait_connected_for(Some(handshake_timeout)) {
            Ok(()) => {
                info!(peer = %session.peer, "peer connected");
                print_event(&Event::Connected { peer: &session.peer }, &[], format);
            }
            Err(BridgeError::Timeout) => {
                warn!(peer = %session.peer, "peer did not complete handshake");
                summary.outcome = "no handshake";
                continue;
            }
            Err(err) => return Err(bridge_error("handshake failed", err)),
        }

        summary.outcome = "stopped";
        while running.load(Ordering::SeqCst) {
            match session.bridge.receive() {
                Ok(payload) => {
                    summary.record(payload.len());
                    print_event(
                        &Event::frame(&session.peer, &payload, &session.bridge),
                        &payload,
                        format,
                    );
                    if on_frame(&session, payload)?.is_break() {
                        summary.outcome = "done";
                        return Ok(peers);
                    }
                }
                Err(BridgeError::Timeout) if session.bridge.is_connected() => {}
                Err(err @ (BridgeError::Timeout | BridgeError::ConnectionClosed)) => {
                    info!(peer = %session.peer, "peer disconnected");
                    let reason = match err {
                        BridgeError::Timeout => "peer went away",
                        _ => "bridge closed",
                    };
                    print_event(
                        &Event::disconnected(&session.peer, reason, &session.bridge),
                        &[],
                        format,
                    );
                    summary.outcome = "disconnected";
                    break;
                }
                Err(err) => return Err(bridge_error("receive failed", err)),
            }
        }
    }

    Ok(peers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_server_stops_when_running_clears() {
        let dir = std::env::temp_dir().join(format!("lb-serve-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let sock = dir.join("idle.sock");
        let link = LinkArgs {
            mtu: 64,
            capacity: 256,
        };
        let running = AtomicBool::new(true);

        let peers = thread::scope(|scope| {
            let server = scope.spawn(|| {
                serve(
                    &sock,
                    &link,
                    Duration::from_secs(1),
                    &running,
                    OutputFormat::Json,
                    |_, _| Ok(ControlFlow::Continue(())),
                )
            });
            thread::sleep(Duration::from_millis(150));
            let stopped_at = Instant::now();
            running.store(false, Ordering::SeqCst);
            let peers = server.join().unwrap().unwrap();
            assert!(stopped_at.elapsed() < Duration::from_secs(1));
            peers
        });

        assert!(peers.is_empty());
        assert!(!sock.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
