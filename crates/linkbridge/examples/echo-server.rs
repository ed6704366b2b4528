//! Minimal echo server: accepts one peer over a Unix socket, bridges it and
//! echoes every frame back.
//!
//! Run with:
//!   cargo run --example echo-server
//!
//! In another terminal:
//!   cargo run --features cli -- send <printed path> --data hello --wait

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use linkbridge::bridge::{BridgeConfig, BridgeError, TransportBridge};
use linkbridge::frame::{FramerConfig, StreamFramer};
use linkbridge::link::UnixDomainSocket;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("linkbridge-echo-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("echo.sock");

    let socket = UnixDomainSocket::bind(&sock_path)?;
    eprintln!("Listening on {}", sock_path.display());

    let stream = socket.accept()?;
    stream.set_read_timeout(Some(Duration::from_millis(50)))?;

    let config = BridgeConfig::default().with_receive_timeout(Some(Duration::from_secs(1)));
    let engine = Arc::new(StreamFramer::new(FramerConfig::for_capacity(
        config.buffer_capacity,
    )));
    let bridge = TransportBridge::new(stream, engine, config);
    bridge.open()?;
    bridge.wait_connected()?;
    eprintln!("Peer connected");

    loop {
        match bridge.receive() {
            Ok(frame) => {
                eprintln!("Received {} bytes", frame.len());
                bridge.send(&frame)?;
            }
            Err(BridgeError::Timeout) if bridge.is_connected() => continue,
            Err(err) => {
                eprintln!("Peer disconnected: {err}");
                break;
            }
        }
    }

    bridge.close();
    drop(socket);
    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}
