use cartfs_cache::DEFAULT_CACHE_FRAMES;
use cartfs_proto::{FRAMES_PER_CARTRIDGE, FRAME_SIZE, MAX_CARTRIDGES};
use cartfs_transport::Endpoint;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("cartfs {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: cartfs");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("CARTFS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("frame_size: {FRAME_SIZE}");
    println!("frames_per_cartridge: {FRAMES_PER_CARTRIDGE}");
    println!("max_cartridges: {MAX_CARTRIDGES}");
    println!("default_cache_frames: {DEFAULT_CACHE_FRAMES}");
    println!("default_endpoint: {}", Endpoint::default());
    println!("unix_sockets: {}", cfg!(unix));

    Ok(SUCCESS)
}
