use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use framerelay_relay::{Encoding, Orientation};
use framerelay_relay::DEFAULT_JPEG_QUALITY;
use framerelay_wire::{DEFAULT_MAX_IMAGE_SIZE, DEFAULT_MAX_SETTINGS_SIZE};

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod poll;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Produce frames and answer the core's polls.
    Serve(ServeArgs),
    /// Act as the core: accept a plugin and poll it for frames.
    Poll(PollArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Poll(args) => poll::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Core host to connect to.
    #[arg(long, env = "PALLEON_HOST", default_value = "127.0.0.1")]
    pub host: String,
    /// Core port to connect to.
    #[arg(long, env = "PALLEON_PORT")]
    pub port: u16,
    /// Target publish rate in frames per second.
    #[arg(long, env = "palleon_fps", default_value_t = framerelay_relay::producer::DEFAULT_FPS)]
    pub fps: f64,
    /// Raw frame file (frames of width*height*channels bytes, back to back).
    #[arg(long, value_name = "PATH", conflicts_with = "pattern", required_unless_present = "pattern")]
    pub source: Option<PathBuf>,
    /// Use a synthetic moving gradient instead of a file.
    #[arg(long)]
    pub pattern: bool,
    /// Frames per loop of the synthetic pattern.
    #[arg(long, default_value_t = 60)]
    pub pattern_frames: u32,
    /// Frame width in pixels.
    #[arg(long, default_value_t = 640)]
    pub width: u32,
    /// Frame height in pixels.
    #[arg(long, default_value_t = 480)]
    pub height: u32,
    /// Bytes per pixel (1 or 3).
    #[arg(long, default_value_t = 3)]
    pub channels: u8,
    /// Correction applied to every frame before encoding.
    #[arg(long, value_enum, default_value = "rotate180")]
    pub orientation: OrientationArg,
    /// Encoding of published frames.
    #[arg(long, value_enum, default_value = "jpeg")]
    pub encoding: EncodingArg,
    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    pub jpeg_quality: u8,
    /// Largest encoded frame the producer may publish.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_IMAGE_SIZE)]
    pub max_frame_size: usize,
    /// Largest settings body (key + value bytes) accepted from the core.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_SETTINGS_SIZE)]
    pub max_settings_size: usize,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct PollArgs {
    /// Address to listen on for the plugin.
    #[arg(long, default_value = "127.0.0.1:7000")]
    pub bind: String,
    /// Delay between image requests (e.g. 33ms, 1s).
    #[arg(long, default_value = "33ms")]
    pub interval: String,
    /// Exit after receiving N fresh frames.
    #[arg(long)]
    pub count: Option<u64>,
    /// Write every fresh frame to this directory.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Settings to push after the plugin connects (KEY=VALUE[:TYPE], repeatable).
    #[arg(long = "set", value_name = "KEY=VALUE[:TYPE]")]
    pub settings: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum OrientationArg {
    Identity,
    Rotate180,
    FlipHorizontal,
    FlipVertical,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Identity => Orientation::Identity,
            OrientationArg::Rotate180 => Orientation::Rotate180,
            OrientationArg::FlipHorizontal => Orientation::FlipHorizontal,
            OrientationArg::FlipVertical => Orientation::FlipVertical,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum EncodingArg {
    Jpeg,
    Pnm,
    Raw,
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Jpeg => Encoding::Jpeg,
            EncodingArg::Pnm => Encoding::Pnm,
            EncodingArg::Raw => Encoding::Raw,
        }
    }
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Parse `5s`, `250ms` or a bare number of seconds.
pub(crate) fn parse_duration(flag: &str, input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, format!("{flag} must not be empty")));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid {flag} value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, format!("{flag} must be greater than zero")));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
