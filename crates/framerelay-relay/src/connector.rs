use std::sync::Arc;
use std::time::Duration;

use framerelay_transport::{RelayStream, TcpEndpoint};
use framerelay_wire::{WireConfig, WireReader, WireWriter};
use tracing::info;

use crate::error::Result;
use crate::hook::SettingsHook;
use crate::responder::Responder;
use crate::slot::FrameSlot;

/// Connect to the core at `host:port` and return a responder for the connection.
pub fn connect<H: SettingsHook>(
    host: &str,
    port: u16,
    slot: Arc<FrameSlot>,
    hook: H,
) -> Result<Responder<RelayStream, RelayStream, H>> {
    connect_with_config(host, port, slot, hook, WireConfig::default(), None)
}

/// Connect with explicit wire limits and an optional connect timeout.
pub fn connect_with_config<H: SettingsHook>(
    host: &str,
    port: u16,
    slot: Arc<FrameSlot>,
    hook: H,
    config: WireConfig,
    connect_timeout: Option<Duration>,
) -> Result<Responder<RelayStream, RelayStream, H>> {
    let stream = match connect_timeout {
        Some(timeout) => TcpEndpoint::connect_timeout(host, port, timeout)?,
        None => TcpEndpoint::connect(host, port)?,
    };
    let reader_stream = stream.try_clone()?;

    let reader = WireReader::with_config_relay(reader_stream, config.clone())?;
    let writer = WireWriter::with_config_relay(stream, config)?;

    info!(host, port, "connected to core");
    Ok(Responder::from_parts(reader, writer, slot, hook))
}
