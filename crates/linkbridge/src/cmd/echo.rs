use std::ops::ControlFlow;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::cmd::{parse_duration, EchoArgs};
use crate::exit::{bridge_error, CliResult, SUCCESS};
use crate::output::{print_summary, OutputFormat};
use crate::session::{install_ctrlc_handler, serve};

pub fn run(args: EchoArgs, format: OutputFormat) -> CliResult<i32> {
    args.link.validate()?;
    let handshake_timeout = parse_duration(&args.connect_timeout)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let peers = serve(
        &args.path,
        &args.link,
        handshake_timeout,
        &running,
        format,
        |session, payload| {
            tracing::debug!(peer = %session.peer, size = payload.len(), "echoing frame");
            session
                .bridge
                .send(&payload)
                .map_err(|err| bridge_error("echo send failed", err))?;
            Ok(ControlFlow::Continue(()))
        },
    )?;

    print_summary(&peers, format);
    Ok(SUCCESS)
}
