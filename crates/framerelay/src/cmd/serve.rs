use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use framerelay_relay::{
    connect_with_config, Encoding, FrameEncoder, FrameSlot, FrameSource, JpegEncoder,
    LogSettingsHook, PatternSource, Producer, ProducerConfig, RawFileSource, RelayError,
    ResponderStats,
};
use framerelay_wire::WireConfig;

use crate::cmd::{install_ctrlc_handler, parse_duration, ServeArgs};
use crate::exit::{relay_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_serve_summary, OutputFormat};

/// Whichever worker finishes first decides how `serve` exits.
enum Finished {
    Producer(Result<(), RelayError>),
    Responder(Result<ResponderStats, RelayError>),
}

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let producer_config = ProducerConfig {
        fps: args.fps,
        orientation: args.orientation.into(),
        max_frame_size: args.max_frame_size,
    };
    let encoder = build_encoder(&args).map_err(|err| relay_error("invalid encoder", err))?;
    let connect_timeout = parse_duration("--connect-timeout", &args.connect_timeout)?;
    let wire_config = WireConfig {
        max_settings_size: args.max_settings_size,
        ..WireConfig::default()
    };

    // An unusable source is reported before anything connects.
    let source = open_source(&args).map_err(|err| relay_error("open source failed", err))?;

    let slot = Arc::new(FrameSlot::new());
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    let mut producer = Producer::new(
        source,
        encoder,
        Arc::clone(&slot),
        producer_config,
    )
    .map_err(|err| relay_error("invalid producer config", err))?
    .with_running_flag(Arc::clone(&running));

    let mut responder = connect_with_config(
        &args.host,
        args.port,
        Arc::clone(&slot),
        LogSettingsHook,
        wire_config,
        Some(connect_timeout),
    )
    .map_err(|err| relay_error("connect failed", err))?;

    let (tx, rx) = mpsc::channel();

    let producer_tx = tx.clone();
    let producer_handle = thread::Builder::new()
        .name("producer".to_string())
        .spawn(move || {
            let _ = producer_tx.send(Finished::Producer(producer.run()));
        })
        .map_err(|err| CliError::new(INTERNAL, format!("spawn producer failed: {err}")))?;

    thread::Builder::new()
        .name("responder".to_string())
        .spawn(move || {
            let _ = tx.send(Finished::Responder(responder.serve()));
        })
        .map_err(|err| CliError::new(INTERNAL, format!("spawn responder failed: {err}")))?;

    let finished = rx
        .recv()
        .map_err(|_| CliError::new(INTERNAL, "worker threads exited without reporting"))?;

    match finished {
        Finished::Responder(Ok(stats)) => {
            running.store(false, Ordering::SeqCst);
            let _ = producer_handle.join();
            print_serve_summary(&stats, &slot.snapshot(), format);
            Ok(SUCCESS)
        }
        Finished::Responder(Err(err)) => {
            running.store(false, Ordering::SeqCst);
            Err(relay_error("responder failed", err))
        }
        Finished::Producer(Ok(())) => {
            tracing::info!("interrupted, shutting down");
            Ok(SUCCESS)
        }
        Finished::Producer(Err(err)) => Err(relay_error("producer failed", err)),
    }
}

fn build_encoder(args: &ServeArgs) -> Result<Box<dyn FrameEncoder>, RelayError> {
    match Encoding::from(args.encoding) {
        Encoding::Jpeg => Ok(Box::new(JpegEncoder::new(args.jpeg_quality)?)),
        other => Ok(other.encoder()),
    }
}

fn open_source(args: &ServeArgs) -> Result<Box<dyn FrameSource>, RelayError> {
    match &args.source {
        Some(path) => Ok(Box::new(RawFileSource::open(
            path,
            args.width,
            args.height,
            args.channels,
        )?)),
        None => Ok(Box::new(PatternSource::new(
            args.width,
            args.height,
            args.channels,
            args.pattern_frames,
        )?)),
    }
}
