use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use linkbridge_bridge::TransportBridge;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per event.
    Json,
    /// One line per event, plus a per-peer summary table on exit.
    Text,
    /// Received payload bytes only.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Text
        } else {
            Self::Json
        }
    }
}

/// Something that happened on a bridged link, as printed on stdout.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event<'a> {
    Connected {
        peer: &'a str,
    },
    Frame {
        peer: &'a str,
        size: usize,
        payload: String,
        /// Bytes still queued behind this frame.
        queued_bytes: usize,
    },
    Disconnected {
        peer: &'a str,
        reason: &'a str,
        state: String,
        queued_bytes: usize,
    },
}

impl<'a> Event<'a> {
    pub fn frame(peer: &'a str, payload: &[u8], bridge: &TransportBridge) -> Self {
        Self::Frame {
            peer,
            size: payload.len(),
            payload: payload_preview(payload),
            queued_bytes: bridge.queued_bytes(),
        }
    }

    pub fn disconnected(peer: &'a str, reason: &'a str, bridge: &TransportBridge) -> Self {
        Self::Disconnected {
            peer,
            reason,
            state: format!("{:?}", bridge.state()),
            queued_bytes: bridge.queued_bytes(),
        }
    }
}

#[derive(Serialize)]
struct Record<'a> {
    timestamp: String,
    #[serde(flatten)]
    event: &'a Event<'a>,
}

/// Print one event. `raw_payload` is what `Raw` writes for a frame.
pub fn print_event(event: &Event<'_>, raw_payload: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let record = Record {
                timestamp: now_unix_seconds(),
                event,
            };
            println!(
                "{}",
                serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Text => println!("{}", event_line(event)),
        OutputFormat::Raw => {
            if matches!(event, Event::Frame { .. }) {
                print_raw(raw_payload);
            }
        }
    }
}

fn event_line(event: &Event<'_>) -> String {
    match event {
        Event::Connected { peer } => format!("{peer}: connected"),
        Event::Frame {
            peer,
            size,
            payload,
            queued_bytes,
        } => format!("{peer}: {size} bytes (queued {queued_bytes}): {payload}"),
        Event::Disconnected {
            peer,
            reason,
            state,
            queued_bytes,
        } => format!("{peer}: disconnected ({reason}) state={state} queued={queued_bytes}"),
    }
}

/// Per-peer totals gathered by the serving loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSummary {
    pub peer: String,
    pub frames: usize,
    pub bytes: usize,
    pub outcome: &'static str,
}

impl PeerSummary {
    pub fn new(peer: &str) -> Self {
        Self {
            peer: peer.to_string(),
            frames: 0,
            bytes: 0,
            outcome: "open",
        }
    }

    pub fn record(&mut self, size: usize) {
        self.frames = self.frames.saturating_add(1);
        self.bytes = self.bytes.saturating_add(size);
    }
}

/// Summary table for text output. Other formats stay line oriented.
pub fn print_summary(peers: &[PeerSummary], format: OutputFormat) {
    if format != OutputFormat::Text || peers.is_empty() {
        return;
    }
    println!("{}", summary_table(peers));
}

fn summary_table(peers: &[PeerSummary]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["PEER", "FRAMES", "BYTES", "OUTCOME"]);
    for peer in peers {
        table.add_row(vec![
            peer.peer.clone(),
            peer.frames.to_string(),
            peer.bytes.to_string(),
            peer.outcome.to_string(),
        ]);
    }
    table
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
