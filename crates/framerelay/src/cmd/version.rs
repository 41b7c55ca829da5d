use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("framerelay {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: framerelay");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("FRAMERELAY_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("features: cli={}", cfg!(feature = "cli"));
    println!(
        "wire: max_settings_size={} max_image_size={}",
        framerelay_wire::DEFAULT_MAX_SETTINGS_SIZE,
        framerelay_wire::DEFAULT_MAX_IMAGE_SIZE
    );

    Ok(SUCCESS)
}
