use std::fs;
use std::time::Duration;

use tracing::warn;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{bridge_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_event, Event, OutputFormat};
use crate::session::{connect_with_retry, Session};

/// Upper bound for writing the frame out before the link is closed.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    args.link.validate()?;
    let connect_timeout = parse_duration(&args.connect_timeout)?;
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;

    let stream = connect_with_retry(&args.path, connect_timeout)?;
    let session = Session::open(stream, &args.link, "peer-1".to_string(), wait_timeout)?;
    session
        .bridge
        .wait_connected_for(Some(connect_timeout))
        .map_err(|err| bridge_error("handshake failed", err))?;

    session
        .bridge
        .send(&payload)
        .map_err(|err| bridge_error("send failed", err))?;

    if args.wait {
        let reply = session
            .bridge
            .receive()
            .map_err(|err| bridge_error("receive failed", err))?;
        print_event(
            &Event::frame(&session.peer, &reply, &session.bridge),
            &reply,
            format,
        );
    }

    if !session.flush(FLUSH_TIMEOUT) {
        warn!("link closed before all frames were written");
    }
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.as_bytes().to_vec());
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Ok(Vec::new())
}
