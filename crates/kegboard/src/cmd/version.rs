use kegboard_frame::{MAX_FRAME_SIZE, PREFIX};
use kegboard_transport::DEFAULT_SPEED;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("kegboard {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: kegboard");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "protocol: {} (max frame {MAX_FRAME_SIZE} bytes)",
        String::from_utf8_lossy(&PREFIX).trim_end_matches(':')
    );
    println!("default_speed: {DEFAULT_SPEED}");
    println!(
        "build_target: {}",
        option_env!("KEGBOARD_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("KEGBOARD_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));

    Ok(SUCCESS)
}
