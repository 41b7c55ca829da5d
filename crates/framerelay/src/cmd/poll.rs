use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use framerelay_relay::CoreListener;
use framerelay_wire::{ImageReply, SettingsMessage};

use crate::cmd::{install_ctrlc_handler, parse_duration, PollArgs};
use crate::exit::{io_error, relay_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{payload_kind, print_reply, OutputFormat};

pub fn run(args: PollArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration("--interval", &args.interval)?;
    let settings = args
        .settings
        .iter()
        .map(|raw| parse_setting(raw))
        .collect::<CliResult<Vec<_>>>()?;

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir).map_err(|err| io_error("create output dir failed", err))?;
    }

    let listener = CoreListener::bind(&args.bind).map_err(|err| relay_error("bind failed", err))?;
    tracing::info!(addr = %listener.local_addr(), "waiting for plugin");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    let mut poller = listener
        .accept()
        .map_err(|err| relay_error("accept failed", err))?;
    let peer = poller
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    tracing::info!(peer = %peer, "plugin connected");

    for message in &settings {
        poller
            .send_settings(message)
            .map_err(|err| relay_error("send settings failed", err))?;
    }

    let mut sequence = 0u64;
    let mut fresh = 0u64;
    while running.load(Ordering::SeqCst) {
        if args.count.is_some_and(|count| fresh >= count) {
            break;
        }

        let reply = poller
            .request_image()
            .map_err(|err| relay_error("poll failed", err))?;
        sequence += 1;

        if let ImageReply::Fresh(payload) = &reply {
            fresh += 1;
            if let Some(dir) = &args.output_dir {
                write_frame(dir, fresh, payload)?;
            }
        }
        print_reply(sequence, &reply, &peer, format);

        std::thread::sleep(interval);
    }

    tracing::info!(polls = sequence, fresh, "polling finished");
    Ok(SUCCESS)
}

fn write_frame(dir: &Path, index: u64, payload: &[u8]) -> CliResult<()> {
    let path = dir.join(format!("frame-{index}.{}", payload_kind(payload)));
    std::fs::write(&path, payload)
        .map_err(|err| io_error(&format!("write {} failed", path.display()), err))
}

/// Parse `KEY=VALUE[:TYPE]`. The type defaults to 0; a trailing `:N` is only
/// taken as the type when `N` is an integer.
fn parse_setting(raw: &str) -> CliResult<SettingsMessage> {
    let (key, rest) = raw
        .split_once('=')
        .ok_or_else(|| CliError::new(USAGE, format!("--set expects KEY=VALUE[:TYPE], got {raw:?}")))?;
    if key.is_empty() {
        return Err(CliError::new(USAGE, format!("--set key must not be empty: {raw:?}")));
    }

    let (value, value_type) = match rest.rsplit_once(':') {
        Some((value, ty)) => match ty.parse::<i32>() {
            Ok(value_type) => (value, value_type),
            Err(_) => (rest, 0),
        },
        None => (rest, 0),
    };

    Ok(SettingsMessage::new(
        key.as_bytes().to_vec(),
        value.as_bytes().to_vec(),
        value_type,
    ))
}
