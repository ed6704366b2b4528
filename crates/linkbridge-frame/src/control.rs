use serde::{Deserialize, Serialize};

/// CONTROL message type: link announcement sent when an engine starts.
pub const CONTROL_HELLO: &str = "hello";
/// CONTROL message type: answer to a hello; completes the connection.
pub const CONTROL_HELLO_ACK: &str = "hello_ack";
/// CONTROL message type: receive buffer space handed back to the sender.
pub const CONTROL_CREDIT: &str = "credit";

/// CONTROL channel message payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Largest DATA payload the sender accepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<usize>,
    /// DATA payload bytes the sender can buffer before it consumes any.
    /// Absent means the sender does not limit its peer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<usize>,
    /// Payload bytes consumed since the last credit message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit: Option<usize>,
}

impl ControlMessage {
    fn new(msg_type: &str) -> Self {
        Self {
            msg_type: msg_type.to_string(),
            mtu: None,
            window: None,
            credit: None,
        }
    }

    pub fn hello(mtu: usize) -> Self {
        Self {
            mtu: Some(mtu),
            ..Self::new(CONTROL_HELLO)
        }
    }

    pub fn hello_ack(mtu: usize) -> Self {
        Self {
            mtu: Some(mtu),
            ..Self::new(CONTROL_HELLO_ACK)
        }
    }

    pub fn credit(bytes: usize) -> Self {
        Self {
            credit: Some(bytes),
            ..Self::new(CONTROL_CREDIT)
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing a struct of strings and integers cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
