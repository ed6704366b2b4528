use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use linkbridge_link::ByteLink;
use tracing::{debug, info, trace, warn};

use crate::channel::{CONTROL, DATA};
use crate::codec::{decode_frame, encode_to_bytes, Frame, HEADER_SIZE};
use crate::control::{ControlMessage, CONTROL_CREDIT, CONTROL_HELLO, CONTROL_HELLO_ACK};
use crate::engine::{ConnectionHandler, FrameHandler, FramingEngine};
use crate::error::EngineError;

const RX_CHUNK_SIZE: usize = 512;
/// Control messages are small JSON objects; they may exceed a tiny MTU.
const CONTROL_MAX_PAYLOAD: usize = 128;
/// Address reported to the connection handler; this engine has one peer.
const PEER_ADDRESS: u16 = 0;

/// Configuration for [`StreamFramer`].
#[derive(Debug, Clone)]
pub struct FramerConfig {
    /// Largest DATA payload accepted from the peer. Advertised in the
    /// handshake so a well-behaved peer never sends more.
    pub max_frame_size: usize,
    /// DATA payload bytes the consumer can hold before it releases any.
    /// Advertised in the handshake; the peer never has more unreleased
    /// bytes in flight.
    pub rx_window: usize,
    /// Outgoing DATA frames buffered before `write_frame` blocks.
    pub tx_queue_frames: usize,
    /// How long `write_frame` waits for queue room. `None` waits forever.
    pub send_timeout: Option<Duration>,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            max_frame_size: 256,
            rx_window: 256,
            tx_queue_frames: 8,
            send_timeout: Some(Duration::from_millis(500)),
        }
    }
}

impl FramerConfig {
    /// Default configuration whose MTU and receive window both match a
    /// receive buffer capacity.
    pub fn for_capacity(capacity: usize) -> Self {
        Self {
            max_frame_size: capacity,
            rx_window: capacity,
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct Handlers {
    frame: Option<FrameHandler>,
    connection: Option<ConnectionHandler>,
}

#[derive(Default)]
struct LinkState {
    running: bool,
    connected: bool,
    peer_mtu: Option<usize>,
    peer_window: Option<usize>,
    /// Payload bytes the peer can still accept.
    tx_credit: usize,
    /// Payload bytes released locally and not yet reported to the peer.
    rx_released: usize,
    send_timeout: Option<Duration>,
    control: VecDeque<Bytes>,
    data: VecDeque<Bytes>,
    in_flight: Option<(Bytes, usize)>,
}

impl LinkState {
    fn clear_output(&mut self) {
        self.control.clear();
        self.data.clear();
        self.in_flight = None;
    }

    fn forget_peer(&mut self) {
        self.peer_mtu = None;
        self.peer_window = None;
        self.tx_credit = 0;
        self.rx_released = 0;
    }

    /// Largest payload the peer will take in one frame.
    fn max_payload(&self, own_mtu: usize) -> usize {
        let mtu = self.peer_mtu.unwrap_or(own_mtu);
        self.peer_window.map_or(mtu, |window| mtu.min(window))
    }
}

/// Reference framing engine for stream links.
///
/// Frames use the crate's length-prefixed codec. Connection management is a
/// JSON handshake on the CONTROL channel: each side announces itself with
/// `hello` when it starts and answers a peer's `hello` with `hello_ack`;
/// either message marks the link connected. End of stream or a hard I/O
/// error marks it disconnected.
///
/// Receive flow control is credit based. Each side announces `rx_window`
/// in its handshake message; a sender spends credit for every DATA payload
/// byte it writes and holds further frames back once the credit is gone.
/// The receiver returns credit with a `credit` message as its consumer
/// calls [`FramingEngine::release`]. A consumer buffer of `rx_window` bytes
/// therefore never overflows. There is no retransmission.
pub struct StreamFramer {
    config: FramerConfig,
    state: Mutex<LinkState>,
    tx_space: Condvar,
    rx_buf: Mutex<BytesMut>,
    handlers: Mutex<Handlers>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

impl StreamFramer {
    pub fn new(config: FramerConfig) -> Self {
        let state = LinkState {
            send_timeout: config.send_timeout,
            ..LinkState::default()
        };
        Self {
            config,
            state: Mutex::new(state),
            tx_space: Condvar::new(),
            rx_buf: Mutex::new(BytesMut::with_capacity(RX_CHUNK_SIZE)),
            handlers: Mutex::new(Handlers::default()),
        }
    }

    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    /// True when no frame is queued or partially written.
    pub fn is_idle(&self) -> bool {
        let state = lock(&self.state);
        state.control.is_empty() && state.data.is_empty() && state.in_flight.is_none()
    }

    /// MTU announced by the peer, once connected.
    pub fn peer_mtu(&self) -> Option<usize> {
        lock(&self.state).peer_mtu
    }

    /// Payload bytes the peer can still accept before it returns credit.
    pub fn tx_credit(&self) -> usize {
        lock(&self.state).tx_credit
    }

    fn handshake_message(&self, message: ControlMessage) -> ControlMessage {
        message.with_window(self.config.rx_window)
    }

    /// Queue credit for payload the local consumer will never see.
    fn return_credit(&self, bytes: usize) {
        let mut state = lock(&self.state);
        if state.connected {
            state.rx_released = state.rx_released.saturating_add(bytes);
        }
    }

    fn control_frame(message: &ControlMessage) -> Result<Bytes, EngineError> {
        Ok(encode_to_bytes(CONTROL, &message.to_bytes())?)
    }

    fn notify_connection(&self, connected: bool) {
        let handler = lock(&self.handlers).connection.clone();
        if let Some(handler) = handler {
            handler(PEER_ADDRESS, connected);
        }
    }

    fn mark_connected(&self, message: &ControlMessage, reply: Option<Bytes>) {
        let newly_connected = {
            let mut state = lock(&self.state);
            if !state.running {
                return;
            }
            if let Some(reply) = reply {
                state.control.push_back(reply);
            }
            state.peer_mtu = message.mtu;
            let newly_connected = !std::mem::replace(&mut state.connected, true);
            if newly_connected {
                // Credit starts once per connection; the second handshake
                // message must not refill it.
                state.peer_window = message.window;
                state.tx_credit = message.window.unwrap_or(usize::MAX);
                state.rx_released = 0;
            }
            newly_connected
        };
        if newly_connected {
            info!(peer_mtu = message.mtu, peer_window = message.window, "peer connected");
            self.notify_connection(true);
        }
    }

    fn lose_connection(&self, reason: &'static str) {
        let was_connected = {
            let mut state = lock(&self.state);
            state.data.clear();
            state.forget_peer();
            std::mem::replace(&mut state.connected, false)
        };
        self.tx_space.notify_all();
        if was_connected {
            info!(reason, "peer disconnected");
            self.notify_connection(false);
        }
    }

    fn handle_control(&self, payload: &[u8]) {
        let message = match ControlMessage::from_bytes(payload) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "ignoring malformed control message");
                return;
            }
        };

        match message.msg_type.as_str() {
            CONTROL_HELLO => {
                debug!(peer_mtu = message.mtu, "received hello");
                let ack =
                    self.handshake_message(ControlMessage::hello_ack(self.config.max_frame_size));
                match Self::control_frame(&ack) {
                    Ok(reply) => self.mark_connected(&message, Some(reply)),
                    Err(err) => warn!(error = %err, "failed to encode hello_ack"),
                }
            }
            CONTROL_HELLO_ACK => {
                debug!(peer_mtu = message.mtu, "received hello_ack");
                self.mark_connected(&message, None);
            }
            CONTROL_CREDIT => {
                let bytes = message.credit.unwrap_or(0);
                let mut state = lock(&self.state);
                if state.connected {
                    state.tx_credit = state.tx_credit.saturating_add(bytes);
                    trace!(bytes, credit = state.tx_credit, "credit received");
                }
            }
            other => debug!(msg_type = other, "ignoring unknown control message"),
        }
    }

    fn dispatch(&self, frame: Frame) {
        if frame.channel == CONTROL {
            self.handle_control(&frame.payload);
            return;
        }

        if !self.is_connected() {
            debug!(
                channel = frame.channel,
                size = frame.payload.len(),
                "dropping frame received before connection"
            );
            return;
        }
        if frame.payload.len() > self.config.max_frame_size {
            warn!(
                size = frame.payload.len(),
                max = self.config.max_frame_size,
                "dropping frame above advertised mtu"
            );
            self.return_credit(frame.payload.len());
            return;
        }

        let handler = lock(&self.handlers).frame.clone();
        match handler {
            Some(handler) => handler(frame.channel, &frame.payload),
            None => {
                debug!(channel = frame.channel, "no frame handler registered");
                self.return_credit(frame.payload.len());
            }
        }
    }
}

impl FramingEngine for StreamFramer {
    fn begin(&self) -> Result<(), EngineError> {
        let hello = self.handshake_message(ControlMessage::hello(self.config.max_frame_size));
        let hello = Self::control_frame(&hello)?;
        {
            let mut state = lock(&self.state);
            state.clear_output();
            state.forget_peer();
            state.running = true;
            state.connected = false;
            state.control.push_back(hello);
        }
        lock(&self.rx_buf).clear();
        debug!(
            mtu = self.config.max_frame_size,
            window = self.config.rx_window,
            "framing engine started"
        );
        Ok(())
    }

    fn end(&self) {
        let was_connected = {
            let mut state = lock(&self.state);
            state.running = false;
            state.clear_output();
            state.forget_peer();
            std::mem::replace(&mut state.connected, false)
        };
        self.tx_space.notify_all();
        debug!("framing engine stopped");
        if was_connected {
            self.notify_connection(false);
        }
    }

    fn run_rx(&self, link: &dyn ByteLink) -> Result<usize, EngineError> {
        if !self.is_running() {
            return Ok(0);
        }

        let mut chunk = [0u8; RX_CHUNK_SIZE];
        let read = match link.read(&mut chunk) {
            Ok(0) => {
                self.lose_connection("end of stream");
                return Err(EngineError::LinkClosed);
            }
            Ok(n) => n,
            Err(err) if is_transient(err.kind()) => return Ok(0),
            Err(err) => {
                self.lose_connection("read failed");
                return Err(EngineError::Io(err));
            }
        };

        let frames = {
            let mut buf = lock(&self.rx_buf);
            buf.extend_from_slice(&chunk[..read]);
            let max_payload = self.config.max_frame_size.max(CONTROL_MAX_PAYLOAD);
            let mut frames = Vec::new();
            loop {
                match decode_frame(&mut buf, max_payload) {
                    Ok(Some(frame)) => frames.push(frame),
                    Ok(None) => break,
                    Err(err) => {
                        warn!(error = %err, discarded = buf.len(), "discarding corrupt input");
                        buf.clear();
                        break;
                    }
                }
            }
            frames
        };

        for frame in frames {
            self.dispatch(frame);
        }
        Ok(read)
    }

    fn run_tx(&self, link: &dyn ByteLink) -> Result<usize, EngineError> {
        let (frame, offset) = {
            let mut state = lock(&self.state);
            if !state.running {
                return Ok(0);
            }
            if state.in_flight.is_none() {
                let next = match state.control.pop_front() {
                    Some(frame) => frame,
                    None if state.connected && state.rx_released > 0 => {
                        let bytes = std::mem::take(&mut state.rx_released);
                        trace!(bytes, "returning credit");
                        Self::control_frame(&ControlMessage::credit(bytes))?
                    }
                    None => {
                        let payload = match state.data.front() {
                            Some(frame) => frame.len() - HEADER_SIZE,
                            None => return Ok(0),
                        };
                        if payload > state.tx_credit {
                            trace!(payload, credit = state.tx_credit, "waiting for credit");
                            return Ok(0);
                        }
                        state.tx_credit -= payload;
                        match state.data.pop_front() {
                            Some(frame) => frame,
                            None => return Ok(0),
                        }
                    }
                };
                state.in_flight = Some((next, 0));
                self.tx_space.notify_all();
            }
            match &state.in_flight {
                Some((frame, offset)) => (frame.clone(), *offset),
                None => return Ok(0),
            }
        };

        match link.write(&frame[offset..]) {
            Ok(0) => {
                lock(&self.state).in_flight = None;
                self.lose_connection("link accepted no bytes");
                Err(EngineError::LinkClosed)
            }
            Ok(written) => {
                let complete = {
                    let mut state = lock(&self.state);
                    let complete = match state.in_flight.as_mut() {
                        Some((_, sent)) => {
                            *sent += written;
                            *sent >= frame.len()
                        }
                        None => false,
                    };
                    if complete {
                        state.in_flight = None;
                    }
                    complete
                };
                if complete {
                    trace!(size = frame.len(), "frame written");
                    link.flush()?;
                }
                Ok(written)
            }
            Err(err) if is_transient(err.kind()) => Ok(0),
            Err(err) => {
                lock(&self.state).in_flight = None;
                self.lose_connection("write failed");
                Err(EngineError::Io(err))
            }
        }
    }

    fn write_frame(&self, payload: &[u8]) -> Result<(), EngineError> {
        let mut state = lock(&self.state);
        let max = state.max_payload(self.config.max_frame_size);
        if payload.len() > max {
            return Err(EngineError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }

        let deadline = state.send_timeout.map(|timeout| Instant::now() + timeout);
        loop {
            if !state.running {
                return Err(EngineError::NotRunning);
            }
            if !state.connected {
                return Err(EngineError::NotConnected);
            }
            if state.data.len() < self.config.tx_queue_frames {
                break;
            }
            state = match deadline {
                None => self
                    .tx_space
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(EngineError::QueueFull);
                    }
                    self.tx_space
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }

        state.data.push_back(encode_to_bytes(DATA, payload)?);
        trace!(size = payload.len(), queued = state.data.len(), "frame queued");
        Ok(())
    }

    fn set_send_timeout(&self, timeout: Option<Duration>) {
        lock(&self.state).send_timeout = timeout;
    }

    fn release(&self, bytes: usize) {
        self.return_credit(bytes);
    }

    fn set_frame_handler(&self, handler: FrameHandler) {
        lock(&self.handlers).frame = Some(handler);
    }

    fn set_connection_handler(&self, handler: ConnectionHandler) {
        lock(&self.handlers).connection = Some(handler);
    }
}

impl std::fmt::Debug for StreamFramer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("StreamFramer")
            .field("config", &self.config)
            .field("running", &state.running)
            .field("connected", &state.connected)
            .field("queued", &state.data.len())
            .field("tx_credit", &state.tx_credit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use linkbridge_link::LinkStream;

    use super::*;
    use crate::codec::encode_frame;

    type Events = Arc<Mutex<Vec<bool>>>;
    type Received = Arc<Mutex<Vec<(u16, Vec<u8>)>>>;

    fn engine(config: FramerConfig) -> (StreamFramer, Events, Received) {
        let engine = StreamFramer::new(config);
        let events: Events = Arc::default();
        let received: Received = Arc::default();
        {
            let events = Arc::clone(&events);
            engine.set_connection_handler(Arc::new(move |_, up| events.lock().unwrap().push(up)));
        }
        {
            let received = Arc::clone(&received);
            engine.set_frame_handler(Arc::new(move |channel, payload| {
                received.lock().unwrap().push((channel, payload.to_vec()))
            }));
        }
        (engine, events, received)
    }

    fn links() -> (LinkStream, LinkStream) {
        let (a, b) = LinkStream::pair().unwrap();
        a.set_read_timeout(Some(Duration::from_millis(10))).unwrap();
        b.set_read_timeout(Some(Duration::from_millis(10))).unwrap();
        (a, b)
    }

    fn step(engine: &StreamFramer, link: &LinkStream) {
        while engine.run_tx(link).unwrap() > 0 {}
        let _ = engine.run_rx(link);
    }

    fn handshake(
        a: &StreamFramer,
        link_a: &LinkStream,
        b: &StreamFramer,
        link_b: &LinkStream,
    ) {
        a.begin().unwrap();
        b.begin().unwrap();
        for _ in 0..4 {
            step(a, link_a);
            step(b, link_b);
        }
        assert!(a.is_connected() && b.is_connected());
    }

    #[test]
    fn hello_exchange_connects_both_sides() {
        let (link_a, link_b) = links();
        let (a, events_a, _) = engine(FramerConfig::default());
        let (b, events_b, _) = engine(FramerConfig::for_capacity(64));

        handshake(&a, &link_a, &b, &link_b);

        assert_eq!(*events_a.lock().unwrap(), vec![true]);
        assert_eq!(*events_b.lock().unwrap(), vec![true]);
        assert_eq!(a.peer_mtu(), Some(64));
        assert_eq!(b.peer_mtu(), Some(256));
    }

    #[test]
    fn data_frames_reach_the_peer_in_order() {
        let (link_a, link_b) = links();
        let (a, _, _) = engine(FramerConfig::default());
        let (b, _, received) = engine(FramerConfig::default());
        handshake(&a, &link_a, &b, &link_b);

        a.write_frame(b"one").unwrap();
        a.write_frame(b"two").unwrap();
        assert!(!a.is_idle());
        step(&a, &link_a);
        assert!(a.is_idle());
        step(&b, &link_b);

        assert_eq!(
            *received.lock().unwrap(),
            vec![(DATA, b"one".to_vec()), (DATA, b"two".to_vec())]
        );
    }

    #[test]
    fn write_frame_preconditions() {
        let (link_a, link_b) = links();
        let (a, _, _) = engine(FramerConfig::default());
        let (b, _, _) = engine(FramerConfig::for_capacity(4));

        assert!(matches!(a.write_frame(b"x"), Err(EngineError::NotRunning)));
        a.begin().unwrap();
        assert!(matches!(a.write_frame(b"x"), Err(EngineError::NotConnected)));

        b.begin().unwrap();
        for _ in 0..4 {
            step(&a, &link_a);
            step(&b, &link_b);
        }
        assert!(matches!(
            a.write_frame(b"12345"),
            Err(EngineError::PayloadTooLarge { size: 5, max: 4 })
        ));
        a.write_frame(b"1234").unwrap();
    }

    #[test]
    fn full_queue_times_out() {
        let (link_a, link_b) = links();
        let (a, _, _) = engine(FramerConfig {
            tx_queue_frames: 1,
            send_timeout: Some(Duration::from_millis(20)),
            ..FramerConfig::default()
        });
        let (b, _, _) = engine(FramerConfig::default());
        handshake(&a, &link_a, &b, &link_b);

        a.write_frame(b"first").unwrap();
        let started = Instant::now();
        assert!(matches!(a.write_frame(b"second"), Err(EngineError::QueueFull)));
        assert!(started.elapsed() >= Duration::from_millis(20));

        // Moving the queued frame onto the wire frees the slot.
        step(&a, &link_a);
        a.write_frame(b"second").unwrap();
    }

    #[test]
    fn blocked_writer_is_released_by_end() {
        let (link_a, link_b) = links();
        let (a, _, _) = engine(FramerConfig {
            tx_queue_frames: 1,
            send_timeout: None,
            ..FramerConfig::default()
        });
        let (b, _, _) = engine(FramerConfig::default());
        handshake(&a, &link_a, &b, &link_b);

        let a = Arc::new(a);
        a.write_frame(b"first").unwrap();
        let blocked = {
            let a = Arc::clone(&a);
            std::thread::spawn(move || a.write_frame(b"second"))
        };
        std::thread::sleep(Duration::from_millis(20));
        a.end();
        assert!(matches!(
            blocked.join().unwrap(),
            Err(EngineError::NotRunning)
        ));
    }

    #[test]
    fn end_of_stream_disconnects() {
        let (link_a, link_b) = links();
        let (a, events_a, _) = engine(FramerConfig::default());
        let (b, _, _) = engine(FramerConfig::default());
        handshake(&a, &link_a, &b, &link_b);

        link_b.shutdown().unwrap();
        assert!(matches!(a.run_rx(&link_a), Err(EngineError::LinkClosed)));
        assert!(!a.is_connected());
        assert_eq!(*events_a.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn end_reports_disconnect_once() {
        let (link_a, link_b) = links();
        let (a, events_a, _) = engine(FramerConfig::default());
        let (b, _, _) = engine(FramerConfig::default());
        handshake(&a, &link_a, &b, &link_b);

        a.end();
        a.end();
        assert!(!a.is_running());
        assert_eq!(*events_a.lock().unwrap(), vec![true, false]);
        assert_eq!(a.run_tx(&link_a).unwrap(), 0);
    }

    #[test]
    fn data_before_handshake_is_dropped() {
        let (link_a, raw) = links();
        let (a, _, received) = engine(FramerConfig::default());
        a.begin().unwrap();

        let mut wire = BytesMut::new();
        encode_frame(DATA, b"early", &mut wire).unwrap();
        raw.write(&wire).unwrap();
        a.run_rx(&link_a).unwrap();

        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn corrupt_input_is_discarded_and_stream_recovers() {
        let (link_a, raw) = links();
        let (a, events, received) = engine(FramerConfig::default());
        a.begin().unwrap();

        raw.write(b"garbage!garbage!").unwrap();
        a.run_rx(&link_a).unwrap();

        let mut wire = BytesMut::new();
        encode_frame(CONTROL, &ControlMessage::hello(32).to_bytes(), &mut wire).unwrap();
        encode_frame(DATA, b"after", &mut wire).unwrap();
        raw.write(&wire).unwrap();
        a.run_rx(&link_a).unwrap();

        assert_eq!(*events.lock().unwrap(), vec![true]);
        assert_eq!(*received.lock().unwrap(), vec![(DATA, b"after".to_vec())]);
    }

    #[test]
    fn oversize_data_frame_never_reaches_handler() {
        let (link_a, raw) = links();
        let (a, _, received) = engine(FramerConfig::for_capacity(8));
        a.begin().unwrap();

        let mut wire = BytesMut::new();
        encode_frame(CONTROL, &ControlMessage::hello_ack(8).to_bytes(), &mut wire).unwrap();
        encode_frame(DATA, b"nine byte", &mut wire).unwrap();
        encode_frame(DATA, b"eight by", &mut wire).unwrap();
        raw.write(&wire).unwrap();
        a.run_rx(&link_a).unwrap();

        assert_eq!(*received.lock().unwrap(), vec![(DATA, b"eight by".to_vec())]);
    }

    #[test]
    fn hello_is_answered_with_ack() {
        let (link_a, raw) = links();
        let (a, _, _) = engine(FramerConfig::default());
        a.begin().unwrap();

        // Drain our own hello first.
        while a.run_tx(&link_a).unwrap() > 0 {}
        let mut wire = BytesMut::new();
        encode_frame(CONTROL, &ControlMessage::hello(100).to_bytes(), &mut wire).unwrap();
        raw.write(&wire).unwrap();
        a.run_rx(&link_a).unwrap();
        while a.run_tx(&link_a).unwrap() > 0 {}

        let mut reader = crate::reader::FrameReader::new(linkbridge_link::LinkIo::new(&raw));
        let hello = reader.read_frame().unwrap();
        let ack = reader.read_frame().unwrap();
        assert_eq!(
            ControlMessage::from_bytes(&hello.payload).unwrap().msg_type,
            CONTROL_HELLO
        );
        assert_eq!(
            ControlMessage::from_bytes(&ack.payload).unwrap(),
            ControlMessage::hello_ack(256).with_window(256)
        );
    }

    #[test]
    fn sender_holds_frames_back_until_credit_returns() {
        let (link_a, link_b) = links();
        let (a, _, _) = engine(FramerConfig::default());
        let (b, _, received) = engine(FramerConfig::for_capacity(8));
        handshake(&a, &link_a, &b, &link_b);
        // hello and hello_ack both arrived; credit was set once.
        assert_eq!(a.tx_credit(), 8);

        a.write_frame(b"12345678").unwrap();
        a.write_frame(b"abcd").unwrap();
        step(&a, &link_a);
        step(&b, &link_b);
        assert_eq!(*received.lock().unwrap(), vec![(DATA, b"12345678".to_vec())]);
        assert_eq!(a.tx_credit(), 0);
        assert!(!a.is_idle());

        b.release(8);
        step(&b, &link_b);
        step(&a, &link_a);
        step(&a, &link_a);
        step(&b, &link_b);

        assert_eq!(received.lock().unwrap().len(), 2);
        assert!(a.is_idle());
        assert_eq!(a.tx_credit(), 4);
    }

    #[test]
    fn window_smaller_than_mtu_caps_frame_size() {
        let (link_a, link_b) = links();
        let (a, _, _) = engine(FramerConfig::default());
        let (b, _, _) = engine(FramerConfig {
            max_frame_size: 64,
            rx_window: 16,
            ..FramerConfig::default()
        });
        handshake(&a, &link_a, &b, &link_b);

        assert!(matches!(
            a.write_frame(&[0u8; 17]),
            Err(EngineError::PayloadTooLarge { size: 17, max: 16 })
        ));
        a.write_frame(&[0u8; 16]).unwrap();
    }

    #[test]
    fn release_before_connection_is_ignored() {
        let (link_a, _raw) = links();
        let (a, _, _) = engine(FramerConfig::default());
        a.begin().unwrap();
        a.release(100);
        while a.run_tx(&link_a).unwrap() > 0 {}
        assert!(a.is_idle());
    }
}
