//! Built-in channel IDs.
//!
//! The channel doubles as the peer address handed to engine callbacks.
//! Channels 0-255 are reserved; 256-65535 are free for applications.

/// Link management (hello, hello_ack).
pub const CONTROL: u16 = 0;

/// RPC frames.
pub const DATA: u16 = 1;

/// First user-defined channel ID.
pub const USER_CHANNEL_START: u16 = 256;

/// Returns a human-readable name for a channel ID.
pub fn channel_name(id: u16) -> &'static str {
    match id {
        CONTROL => "CONTROL",
        DATA => "DATA",
        2..=255 => "RESERVED",
        _ => "USER",
    }
}

/// Returns true if the channel ID is in the reserved range.
pub fn is_reserved(id: u16) -> bool {
    id < USER_CHANNEL_START
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(channel_name(CONTROL), "CONTROL");
        assert_eq!(channel_name(DATA), "DATA");
        assert_eq!(channel_name(7), "RESERVED");
        assert_eq!(channel_name(USER_CHANNEL_START), "USER");
        assert!(is_reserved(DATA));
        assert!(!is_reserved(USER_CHANNEL_START));
    }
}
