use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("ipcbridge {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: ipcbridge");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("IPCBRIDGE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "max_frame_size: {}",
        ipcbridge_frame::DEFAULT_MAX_FRAME_SIZE
    );
    println!("message_tags: {}", ipcbridge_messages::MessageTag::ALL.len());
    println!(
        "features: connection={}, cli=true",
        cfg!(feature = "connection")
    );

    Ok(SUCCESS)
}
