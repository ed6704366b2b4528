use std::ops::ControlFlow;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_summary, OutputFormat};
use crate::session::{install_ctrlc_handler, serve};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    args.link.validate()?;
    let handshake_timeout = parse_duration(&args.connect_timeout)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut received = 0usize;
    let peers = serve(
        &args.path,
        &args.link,
        handshake_timeout,
        &running,
        format,
        |_, _| {
            received = received.saturating_add(1);
            match args.count {
                Some(count) if received >= count => Ok(ControlFlow::Break(())),
                _ => Ok(ControlFlow::Continue(())),
            }
        },
    )?;

    print_summary(&peers, format);
    Ok(SUCCESS)
}
