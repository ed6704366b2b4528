use linkbridge_frame::{CONTROL_CREDIT, CONTROL_HELLO, CONTROL_HELLO_ACK, HEADER_SIZE, MAGIC};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    let version = env!("CARGO_PKG_VERSION");
    if !args.extended {
        println!("linkbridge {version}");
        return Ok(SUCCESS);
    }

    println!("name: linkbridge");
    println!("version: {version}");
    println!(
        "wire: magic={} header={HEADER_SIZE}B",
        String::from_utf8_lossy(&MAGIC)
    );
    println!("control: {CONTROL_HELLO}/{CONTROL_HELLO_ACK} (mtu, window), {CONTROL_CREDIT}");

    Ok(SUCCESS)
}
