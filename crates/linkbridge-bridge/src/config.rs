use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Notified with the new connection state whenever the framing engine
/// reports a change.
pub type ConnectionCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Default send, receive timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);
/// Default receive buffer capacity in bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;
pub const DEFAULT_RX_PRIORITY: u8 = 11;
pub const DEFAULT_TX_PRIORITY: u8 = 10;

/// Configuration for a [`TransportBridge`](crate::TransportBridge).
///
/// Every timeout is an `Option`: `None` waits forever.
#[derive(Clone)]
pub struct BridgeConfig {
    /// How long a send may wait for room in the engine's outgoing queue.
    pub send_timeout: Option<Duration>,
    /// How long `receive` waits for a frame.
    pub receive_timeout: Option<Duration>,
    /// Default bound for `wait_connected`.
    pub connect_timeout: Option<Duration>,
    /// Scheduling hint for the receive worker.
    pub rx_priority: u8,
    /// Scheduling hint for the send worker.
    pub tx_priority: u8,
    pub on_connection_change: Option<ConnectionCallback>,
    /// Receive buffer capacity in payload bytes. The framing engine must
    /// never deliver a frame larger than this.
    pub buffer_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            send_timeout: Some(DEFAULT_TIMEOUT),
            receive_timeout: Some(DEFAULT_TIMEOUT),
            connect_timeout: None,
            rx_priority: DEFAULT_RX_PRIORITY,
            tx_priority: DEFAULT_TX_PRIORITY,
            on_connection_change: None,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl BridgeConfig {
    pub fn with_send_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_priorities(mut self, rx: u8, tx: u8) -> Self {
        self.rx_priority = rx;
        self.tx_priority = tx;
        self
    }

    pub fn with_connection_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.on_connection_change = Some(Arc::new(callback));
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("send_timeout", &self.send_timeout)
            .field("receive_timeout", &self.receive_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("rx_priority", &self.rx_priority)
            .field("tx_priority", &self.tx_priority)
            .field(
                "on_connection_change",
                &self.on_connection_change.as_ref().map(|_| "<callback>"),
            )
            .field("buffer_capacity", &self.buffer_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.send_timeout, Some(Duration::from_millis(500)));
        assert_eq!(cfg.receive_timeout, Some(Duration::from_millis(500)));
        assert_eq!(cfg.connect_timeout, None);
        assert_eq!((cfg.rx_priority, cfg.tx_priority), (11, 10));
        assert_eq!(cfg.buffer_capacity, 256);
        assert!(cfg.on_connection_change.is_none());
    }

    #[test]
    fn builders_override_fields() {
        let cfg = BridgeConfig::default()
            .with_receive_timeout(None)
            .with_connect_timeout(Some(Duration::from_secs(1)))
            .with_priorities(3, 2)
            .with_buffer_capacity(1024)
            .with_connection_callback(|_| {});
        assert_eq!(cfg.receive_timeout, None);
        assert_eq!(cfg.connect_timeout, Some(Duration::from_secs(1)));
        assert_eq!((cfg.rx_priority, cfg.tx_priority), (3, 2));
        assert_eq!(cfg.buffer_capacity, 1024);
        assert!(format!("{cfg:?}").contains("<callback>"));
    }
}
