use std::io::{Read, Write};
use std::sync::Arc;

use framerelay_wire::{
    ImageReply, Opcode, Request, WireConfig, WireError, WireReader, WireWriter,
};
use tracing::{debug, info, warn};

use crate::error::{RelayError, Result};
use crate::hook::SettingsHook;
use crate::slot::{FrameSlot, Outcome};

/// Per-connection request counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponderStats {
    pub settings: u64,
    pub image_requests: u64,
    pub fresh: u64,
    pub unchanged: u64,
    pub no_data: u64,
}

/// Answers the core's requests on one connection.
///
/// Waits for an opcode, handles it, and waits again. Image requests consume
/// the shared slot; settings go to the hook and get no reply. The responder
/// never writes unprompted.
pub struct Responder<R, W, H> {
    reader: WireReader<R>,
    writer: WireWriter<W>,
    slot: Arc<FrameSlot>,
    hook: H,
    stats: ResponderStats,
}

impl<R: Read, W: Write, H: SettingsHook> Responder<R, W, H> {
    /// Create a responder over separate read and write halves with default limits.
    pub fn new(reader: R, writer: W, slot: Arc<FrameSlot>, hook: H) -> Self {
        Self::with_config(reader, writer, slot, hook, WireConfig::default())
    }

    /// Create a responder with explicit wire limits.
    pub fn with_config(
        reader: R,
        writer: W,
        slot: Arc<FrameSlot>,
        hook: H,
        config: WireConfig,
    ) -> Self {
        Self::from_parts(
            WireReader::with_config(reader, config.clone()),
            WireWriter::with_config(writer, config),
            slot,
            hook,
        )
    }

    /// Create a responder from an already configured reader and writer.
    pub fn from_parts(
        reader: WireReader<R>,
        writer: WireWriter<W>,
        slot: Arc<FrameSlot>,
        hook: H,
    ) -> Self {
        Self {
            reader,
            writer,
            slot,
            hook,
            stats: ResponderStats::default(),
        }
    }

    /// Read and handle exactly one request (blocking).
    pub fn handle_next(&mut self) -> Result<Opcode> {
        let request = self.reader.read_request()?;
        let opcode = request.opcode();

        match request {
            Request::Settings(message) => {
                self.stats.settings += 1;
                debug!(
                    key_len = message.key.len(),
                    value_len = message.value.len(),
                    value_type = message.value_type,
                    "settings request"
                );
                self.hook.on_settings(message);
            }
            Request::Image => {
                self.stats.image_requests += 1;
                let reply = match self.slot.try_consume() {
                    Outcome::Fresh(payload) => {
                        self.stats.fresh += 1;
                        ImageReply::Fresh(payload)
                    }
                    Outcome::Unchanged => {
                        self.stats.unchanged += 1;
                        ImageReply::Unchanged
                    }
                    Outcome::NoData => {
                        self.stats.no_data += 1;
                        ImageReply::NoData
                    }
                };
                debug!(
                    status = reply.status(),
                    size = reply.wire_size(),
                    "image request"
                );
                self.writer.write_image_reply(&reply)?;
            }
        }

        Ok(opcode)
    }

    /// Serve requests until the core disconnects.
    ///
    /// A clean close between requests returns the counters. Transport
    /// failures and protocol violations are returned as errors; the caller
    /// drops the responder, which closes the connection.
    pub fn serve(&mut self) -> Result<ResponderStats> {
        loop {
            match self.handle_next() {
                Ok(_) => {}
                Err(RelayError::Wire(WireError::ConnectionClosed)) => {
                    info!(
                        image_requests = self.stats.image_requests,
                        fresh = self.stats.fresh,
                        settings = self.stats.settings,
                        "core closed connection"
                    );
                    return Ok(self.stats);
                }
                Err(err) => {
                    if err.is_protocol_violation() {
                        warn!(error = %err, "protocol violation, closing connection");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> ResponderStats {
        self.stats
    }

    /// Borrow the settings hook.
    pub fn hook(&self) -> &H {
        &self.hook
    }

    /// Borrow the write half.
    pub fn writer(&self) -> &W {
        self.writer.get_ref()
    }
}
