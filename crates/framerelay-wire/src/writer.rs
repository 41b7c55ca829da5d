use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use framerelay_transport::RelayStream;

use crate::codec::{encode_image_reply, encode_request, ImageReply, Request, WireConfig};
use crate::error::{Result, WireError};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete protocol messages to any `Write` stream.
///
/// Each message is encoded into an internal buffer, written in full and
/// flushed before the call returns.
pub struct WireWriter<T> {
    inner: T,
    buf: BytesMut,
    config: WireConfig,
}

impl<T: Write> WireWriter<T> {
    /// Create a new writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    /// Create a new writer with explicit configuration.
    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write an image reply (blocking).
    ///
    /// Only the i32 length field bounds the payload; `max_image_size` limits
    /// what the core side accepts, not what the plugin sends.
    pub fn write_image_reply(&mut self, reply: &ImageReply) -> Result<()> {
        self.buf.clear();
        encode_image_reply(reply, &mut self.buf)?;
        self.write_buffered()
    }

    /// Write a request (blocking).
    pub fn write_request(&mut self, request: &Request) -> Result<()> {
        self.buf.clear();
        encode_request(request, &mut self.buf)?;
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(WireError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current writer configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }
}

impl WireWriter<RelayStream> {
    /// Create a writer for `RelayStream` and apply write timeout from config.
    pub fn with_config_relay(inner: RelayStream, config: WireConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
