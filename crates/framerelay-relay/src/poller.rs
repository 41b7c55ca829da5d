use std::io::{Read, Write};
use std::net::SocketAddr;

use framerelay_transport::{RelayStream, TcpEndpoint};
use framerelay_wire::{ImageReply, Request, SettingsMessage, WireConfig, WireReader, WireWriter};
use tracing::debug;

use crate::error::Result;

/// Core side of the connection: waits for the plugin to connect.
pub struct CoreListener {
    endpoint: TcpEndpoint,
    config: WireConfig,
}

impl CoreListener {
    /// Bind to `addr` (e.g. `"127.0.0.1:7000"`).
    pub fn bind(addr: &str) -> Result<Self> {
        Ok(Self {
            endpoint: TcpEndpoint::bind(addr)?,
            config: WireConfig::default(),
        })
    }

    /// Override wire limits for accepted connections.
    pub fn with_config(mut self, config: WireConfig) -> Self {
        self.config = config;
        self
    }

    /// The bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// Accept the plugin connection (blocking).
    pub fn accept(&self) -> Result<CorePoller<RelayStream, RelayStream>> {
        let stream = self.endpoint.accept()?;
        let reader_stream = stream.try_clone()?;
        let reader = WireReader::with_config_relay(reader_stream, self.config.clone())?;
        let writer = WireWriter::with_config_relay(stream, self.config.clone())?;
        Ok(CorePoller { reader, writer })
    }
}

/// Drives a plugin the way the core does: polls for images and pushes settings.
pub struct CorePoller<R, W> {
    reader: WireReader<R>,
    writer: WireWriter<W>,
}

impl<R: Read, W: Write> CorePoller<R, W> {
    /// Create a poller over separate read and write halves.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: WireReader::new(reader),
            writer: WireWriter::new(writer),
        }
    }

    /// Send `'i'` and wait for the reply.
    pub fn request_image(&mut self) -> Result<ImageReply> {
        self.writer.write_request(&Request::Image)?;
        let reply = self.reader.read_image_reply()?;
        debug!(status = reply.status(), size = reply.wire_size(), "image reply");
        Ok(reply)
    }

    /// Send a settings message. The plugin does not answer.
    pub fn send_settings(&mut self, message: &SettingsMessage) -> Result<()> {
        self.writer
            .write_request(&Request::Settings(message.clone()))?;
        Ok(())
    }
}

impl CorePoller<RelayStream, RelayStream> {
    /// Address of the connected plugin.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.writer.get_ref().peer_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{Bytes, BytesMut};
    use framerelay_wire::{decode_request, encode_image_reply, DEFAULT_MAX_SETTINGS_SIZE};

    use super::*;

    #[test]
    fn request_image_writes_opcode_and_decodes_reply() {
        let mut replies = BytesMut::new();
        encode_image_reply(&ImageReply::Fresh(Bytes::from_static(b"img")), &mut replies).unwrap();
        encode_image_reply(&ImageReply::Unchanged, &mut replies).unwrap();

        let mut poller = CorePoller::new(Cursor::new(replies.to_vec()), Vec::new());
        assert_eq!(
            poller.request_image().unwrap(),
            ImageReply::Fresh(Bytes::from_static(b"img"))
        );
        assert_eq!(poller.request_image().unwrap(), ImageReply::Unchanged);
        assert_eq!(poller.writer.get_ref().as_slice(), b"ii");
    }

    #[test]
    fn send_settings_encodes_request() {
        let mut poller = CorePoller::new(Cursor::new(Vec::new()), Vec::new());
        let message = SettingsMessage::new(&b"mode"[..], &b"auto"[..], 3);
        poller.send_settings(&message).unwrap();

        let mut wire = BytesMut::from(poller.writer.get_ref().as_slice());
        assert_eq!(
            decode_request(&mut wire, DEFAULT_MAX_SETTINGS_SIZE).unwrap(),
            Some(Request::Settings(message))
        );
    }

    #[test]
    fn reply_after_plugin_disconnect_is_error() {
        let mut poller = CorePoller::new(Cursor::new(Vec::new()), Vec::new());
        assert!(poller.request_image().is_err());
    }
}
